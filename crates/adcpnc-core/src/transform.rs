use nalgebra::{Matrix3, Vector3};
use ndarray::{Array2, ArrayView1, ArrayView2, Zip};
use tracing::{info, warn};

use crate::config::Declination;
use crate::dataset::{Dataset, Dim, Variable};
use crate::error::{PipelineError, PipelineWarning, Result, Stage};
use crate::instrument::{CalibrationMatrix, CoordinateSystem, Orientation};

/// Heading rotation. Heading is the compass angle clockwise from north with
/// the instrument +y axis forward.
pub fn heading_matrix(heading_deg: f64) -> Matrix3<f64> {
    let (sh, ch) = heading_deg.to_radians().sin_cos();
    Matrix3::new(ch, sh, 0.0, -sh, ch, 0.0, 0.0, 0.0, 1.0)
}

pub fn tilt_matrix(pitch_deg: f64, roll_deg: f64) -> Matrix3<f64> {
    let (sp, cp) = pitch_deg.to_radians().sin_cos();
    let (sr, cr) = roll_deg.to_radians().sin_cos();
    Matrix3::new(
        cp,
        -sp * sr,
        -cr * sp,
        0.0,
        cr,
        -sr,
        sp,
        sr * cp,
        cp * cr,
    )
}

/// Full rotation from the recorded frame into east/north/up for one sample.
pub fn rotation_matrix(
    system: CoordinateSystem,
    calibration: &CalibrationMatrix,
    orientation: Orientation,
    heading: f64,
    pitch: f64,
    roll: f64,
) -> Matrix3<f64> {
    let flip = || match orientation {
        Orientation::Up => Matrix3::identity(),
        Orientation::Down => Matrix3::from_diagonal(&Vector3::new(1.0, -1.0, -1.0)),
    };
    match system {
        CoordinateSystem::Earth => Matrix3::identity(),
        // Ship axes already follow the vessel heading; only tilt is removed.
        CoordinateSystem::Ship => tilt_matrix(pitch, roll) * flip(),
        CoordinateSystem::Instrument => heading_matrix(heading) * tilt_matrix(pitch, roll) * flip(),
        CoordinateSystem::Beam => {
            heading_matrix(heading) * tilt_matrix(pitch, roll) * calibration.oriented(orientation)
        }
    }
}

pub struct Attitude<'a> {
    pub heading: ArrayView1<'a, f64>,
    pub pitch: ArrayView1<'a, f64>,
    pub roll: ArrayView1<'a, f64>,
}

/// Rotates three (time, bin) velocity components. The rotation is built once
/// per time index and applied to every bin of that index.
pub fn coord_transform(
    vel: [ArrayView2<'_, f64>; 3],
    attitude: &Attitude<'_>,
    calibration: &CalibrationMatrix,
    orientation: Orientation,
    system: CoordinateSystem,
) -> Result<[Array2<f64>; 3]> {
    let dim = vel[0].dim();
    for (component, values) in vel.iter().enumerate() {
        if values.dim() != dim {
            return Err(PipelineError::ShapeMismatch {
                stage: Stage::Transform,
                variable: format!("VEL{}", component + 1),
                dim: Dim::BinDist.name().to_string(),
                expected: dim.1,
                found: values.dim().1,
            });
        }
    }
    for (name, series) in [
        ("Heading", &attitude.heading),
        ("Pitch", &attitude.pitch),
        ("Roll", &attitude.roll),
    ] {
        if series.len() != dim.0 {
            return Err(PipelineError::ShapeMismatch {
                stage: Stage::Transform,
                variable: name.to_string(),
                dim: Dim::Time.name().to_string(),
                expected: dim.0,
                found: series.len(),
            });
        }
    }

    let mut u = Array2::<f64>::zeros(dim);
    let mut v = Array2::<f64>::zeros(dim);
    let mut w = Array2::<f64>::zeros(dim);
    for time in 0..dim.0 {
        let rotation = rotation_matrix(
            system,
            calibration,
            orientation,
            attitude.heading[time],
            attitude.pitch[time],
            attitude.roll[time],
        );
        for bin in 0..dim.1 {
            let beam = Vector3::new(vel[0][(time, bin)], vel[1][(time, bin)], vel[2][(time, bin)]);
            let earth = rotation * beam;
            u[(time, bin)] = earth.x;
            v[(time, bin)] = earth.y;
            w[(time, bin)] = earth.z;
        }
    }
    Ok([u, v, w])
}

/// Adds `U`, `V` and `W` over (time, bindist) from `VEL1..3`.
pub fn transform_velocities(
    mut ds: Dataset,
    system: CoordinateSystem,
    calibration: &CalibrationMatrix,
    orientation: Orientation,
) -> Result<Dataset> {
    let stage = Stage::Transform;
    let [u, v, w] = {
        let vel = [
            ds.require(stage, "VEL1")?.values_2d()?,
            ds.require(stage, "VEL2")?.values_2d()?,
            ds.require(stage, "VEL3")?.values_2d()?,
        ];
        let attitude = Attitude {
            heading: ds.require(stage, "Heading")?.values_1d()?,
            pitch: ds.require(stage, "Pitch")?.values_1d()?,
            roll: ds.require(stage, "Roll")?.values_1d()?,
        };
        coord_transform(vel, &attitude, calibration, orientation, system)?
    };

    let dims = vertical_dims(&ds, "VEL1")?;
    for (name, data) in [("U", u), ("V", v), ("W", w)] {
        ds.insert(stage, name, Variable::grid(dims.clone(), data))?;
    }
    info!(from = system.as_str(), %orientation, "transformed velocities to earth coordinates");
    Ok(ds)
}

fn vertical_dims(ds: &Dataset, name: &str) -> Result<[Dim; 2]> {
    let var = ds.require(Stage::Transform, name)?;
    match var.dims() {
        [first, second] => Ok([first.clone(), second.clone()]),
        other => Err(PipelineError::invalid_attribute(
            Stage::Transform,
            name,
            format!("expected (time, bindist) axes, found {} axes", other.len()),
        )),
    }
}

/// Rotates a horizontal vector by `theta_deg` clockwise, turning magnetic
/// components into true components for a declination of `theta_deg`.
pub fn rotate_horizontal(u: f64, v: f64, theta_deg: f64) -> (f64, f64) {
    let (s, c) = theta_deg.to_radians().sin_cos();
    (u * c + v * s, -u * s + v * c)
}

/// Applies the magnetic declination to `U`, `V` and `Heading`.
pub fn correct_declination(
    mut ds: Dataset,
    declination: Option<Declination>,
) -> Result<(Dataset, Option<PipelineWarning>)> {
    let Some(declination) = declination else {
        let warning = PipelineWarning::DeclinationMissing;
        warn!(%warning, "declination");
        return Ok((ds, Some(warning)));
    };
    let theta = declination.degrees();
    if theta == 0.0 {
        return Ok((ds, None));
    }

    let stage = Stage::Transform;
    let mut u = ds.require(stage, "U")?.clone();
    let mut v = ds.require(stage, "V")?.clone();
    if u.shape() != v.shape() {
        return Err(PipelineError::ShapeMismatch {
            stage,
            variable: "V".to_string(),
            dim: Dim::BinDist.name().to_string(),
            expected: u.data().len(),
            found: v.data().len(),
        });
    }
    Zip::from(u.data_mut())
        .and(v.data_mut())
        .for_each(|east, north| {
            let (rotated_east, rotated_north) = rotate_horizontal(*east, *north, theta);
            *east = rotated_east;
            *north = rotated_north;
        });
    ds.insert(stage, "U", u)?;
    ds.insert(stage, "V", v)?;

    ds.require_mut(stage, "Heading")?
        .data_mut()
        .mapv_inplace(|heading| (heading + theta).rem_euclid(360.0));

    ds.attrs.prepend_history(&format!(
        "Rotated velocity data to account for magnetic variation of {theta}. "
    ));
    info!(degrees = theta, "corrected for magnetic declination");
    Ok((ds, None))
}

/// Average echo intensity over the three beams.
pub fn add_agc(mut ds: Dataset) -> Result<Dataset> {
    let stage = Stage::Transform;
    let amp1 = ds.require(stage, "AMP1")?;
    let amp2 = ds.require(stage, "AMP2")?;
    let amp3 = ds.require(stage, "AMP3")?;
    if amp1.shape() != amp2.shape() || amp1.shape() != amp3.shape() {
        return Err(PipelineError::invalid_attribute(
            stage,
            "AMP1",
            "beam amplitudes differ in shape",
        ));
    }
    let mean = (amp1.data() + amp2.data() + amp3.data()) / 3.0;
    let agc = Variable::new(amp1.dims().to_vec(), mean)?;
    ds.insert(stage, "AGC", agc)?;
    Ok(ds)
}
