use adcpnc_core::config::{
    key_spec, parse_timestamp, ClipWindow, ConversionConfig, Declination, KeyKind, OutputMode,
    TrimPolicy,
};
use adcpnc_core::dataset::Attributes;
use adcpnc_core::error::{PipelineError, Stage};
use adcpnc_core::instrument::Orientation;
use chrono::{TimeZone, Utc};

const GLOBAL_ATTRIBUTES: &str = "\
MOORING; 1126
latitude; 29.7148
longitude; -81.2283
Deployment_date; 2017-05-17 14:00
Recovery_date; 2017-06-20 12:00
magnetic_variation; -6.8
magnetic_variation_at_site; -7.1
initial_instrument_height; 0.25
orientation; UP
trim_method; Water Level SL
WATER_DEPTH; 3.1
good_ens; [[10, 250], [300, 900]]
";

fn minimal() -> Attributes {
    let mut attrs = Attributes::new();
    attrs.insert("latitude", 41.5);
    attrs.insert("longitude", -70.6);
    attrs
}

#[test]
fn global_attribute_file_becomes_typed_config() {
    let attrs = adcpnc_meta::parse_metadata(GLOBAL_ATTRIBUTES).unwrap();
    let config = ConversionConfig::from_attributes(&attrs).unwrap();

    assert_eq!(
        config.clip,
        Some(ClipWindow::Ensembles(vec![(10, 250), (300, 900)]))
    );
    assert_eq!(config.declination, Some(Declination::AtSite(-7.1)));
    assert_eq!(config.trim_policy, TrimPolicy::WaterLevelSideLobe);
    assert_eq!(config.declared_orientation, Some(Orientation::Up));
    assert_eq!(config.initial_instrument_height, Some(0.25));
    assert_eq!(config.water_depth, Some(3.1));
    assert_eq!(config.latitude, 29.7148);
    assert_eq!(config.mode, OutputMode::Profile);
}

#[test]
fn defaults_apply_when_keys_are_absent() {
    let config = ConversionConfig::from_attributes(&minimal()).unwrap();
    assert_eq!(config.clip, None);
    assert_eq!(config.trim_policy, TrimPolicy::None);
    assert_eq!(config.beam_angle, None);
    assert_eq!(config.declination, None);
    assert_eq!(config.declared_orientation, None);
    assert_eq!(config.timeshift, None);
}

#[test]
fn dates_are_used_when_good_ens_is_absent() {
    let mut attrs = minimal();
    attrs.insert("Deployment_date", "2017-05-17 14:00");
    attrs.insert("Recovery_date", "2017-06-20");
    let config = ConversionConfig::from_attributes(&attrs).unwrap();

    assert_eq!(
        config.clip,
        Some(ClipWindow::Dates {
            deployment: Utc.with_ymd_and_hms(2017, 5, 17, 14, 0, 0).unwrap(),
            recovery: Utc.with_ymd_and_hms(2017, 6, 20, 0, 0, 0).unwrap(),
        })
    );
}

#[test]
fn reversed_dates_are_rejected() {
    let mut attrs = minimal();
    attrs.insert("Deployment_date", "2017-06-20");
    attrs.insert("Recovery_date", "2017-05-17");
    let err = ConversionConfig::from_attributes(&attrs).unwrap_err();
    assert!(matches!(err, PipelineError::InvalidTimeRange(_)));
}

#[test]
fn regional_declination_is_the_fallback() {
    let mut attrs = minimal();
    attrs.insert("magnetic_variation", 14.5);
    let config = ConversionConfig::from_attributes(&attrs).unwrap();
    assert_eq!(config.declination, Some(Declination::Regional(14.5)));
}

#[test]
fn trim_methods_parse_case_insensitively() {
    assert_eq!(TrimPolicy::parse("Water Level"), Some(TrimPolicy::WaterLevel));
    assert_eq!(
        TrimPolicy::parse("water level side lobe"),
        Some(TrimPolicy::WaterLevelSideLobe)
    );
    assert_eq!(TrimPolicy::parse("NONE"), Some(TrimPolicy::None));
    assert_eq!(TrimPolicy::parse("bottom track"), None);
}

#[test]
fn unknown_trim_method_names_its_stage() {
    let mut attrs = minimal();
    attrs.insert("trim_method", "bottom track");
    match ConversionConfig::from_attributes(&attrs).unwrap_err() {
        PipelineError::InvalidAttribute { stage, key, .. } => {
            assert_eq!(stage, Stage::Trim);
            assert_eq!(key, "trim_method");
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn missing_position_is_reported() {
    let mut attrs = minimal();
    attrs.remove("longitude");
    match ConversionConfig::from_attributes(&attrs).unwrap_err() {
        PipelineError::MissingAttribute { stage, key } => {
            assert_eq!(stage, Stage::Reshape);
            assert_eq!(key, "longitude");
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn wrong_value_kind_is_rejected() {
    let mut attrs = minimal();
    attrs.insert("WATER_DEPTH", "deep");
    let err = ConversionConfig::from_attributes(&attrs).unwrap_err();
    assert!(matches!(err, PipelineError::InvalidAttribute { .. }));
}

#[test]
fn odd_good_ens_is_rejected() {
    let mut attrs = minimal();
    attrs.insert("good_ens", vec![10.0, 250.0, 300.0]);
    let err = ConversionConfig::from_attributes(&attrs).unwrap_err();
    assert!(matches!(err, PipelineError::InvalidTimeRange(_)));
}

#[test]
fn waves_flag_selects_waves_mode() {
    let mut attrs = minimal();
    attrs.insert("waves", 1.0);
    let config = ConversionConfig::from_attributes(&attrs).unwrap();
    assert_eq!(config.mode, OutputMode::Waves);

    attrs.insert("waves", "false");
    let config = ConversionConfig::from_attributes(&attrs).unwrap();
    assert_eq!(config.mode, OutputMode::Profile);
}

#[test]
fn key_table_describes_consumers() {
    let spec = key_spec("beam_angle").unwrap();
    assert_eq!(spec.kind, KeyKind::Number);
    assert_eq!(spec.stage, Stage::Trim);
    assert_eq!(spec.default, Some("25"));
    assert!(key_spec("not_a_key").is_none());
}

#[test]
fn timestamps_accept_the_documented_forms() {
    let expected = Utc.with_ymd_and_hms(2017, 5, 17, 14, 30, 0).unwrap();
    assert_eq!(parse_timestamp("2017-05-17 14:30:00"), Some(expected));
    assert_eq!(parse_timestamp("2017-05-17 14:30"), Some(expected));
    assert_eq!(parse_timestamp("2017-05-17T14:30:00"), Some(expected));
    assert_eq!(parse_timestamp("2017-05-17T14:30:00Z"), Some(expected));
    assert_eq!(
        parse_timestamp("2017-05-17"),
        Some(Utc.with_ymd_and_hms(2017, 5, 17, 0, 0, 0).unwrap())
    );
    assert_eq!(parse_timestamp("May 17"), None);
}

#[test]
fn beam_angle_is_read_and_range_checked() {
    let mut attrs = minimal();
    attrs.insert("beam_angle", 20.0);
    let config = ConversionConfig::from_attributes(&attrs).unwrap();
    assert_eq!(config.beam_angle, Some(20.0));

    attrs.insert("beam_angle", 95.0);
    let err = ConversionConfig::from_attributes(&attrs).unwrap_err();
    assert!(matches!(
        err,
        PipelineError::InvalidAttribute { stage: Stage::Trim, ref key, .. } if key == "beam_angle"
    ));
}
