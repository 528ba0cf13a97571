mod common;
use common::{synthetic_cube, timeline, SUBJECTS};
use eegtools::io::{load_cube, member_key, write_cube, StWriter};
use eegtools::{AnalysisConfig, AveragedSignal, DataCube, Selector};
use ndarray::Array4;

#[test]
fn cube_survives_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("study.safetensors");
    let cube = synthetic_cube();
    write_cube(&cube, "Data_All", "group", &path).unwrap();

    let loaded = load_cube(&path, "Data_All", "group").unwrap();
    assert_eq!(loaded.dims(), cube.dims());
    assert_eq!(loaded.s2(), cube.s2());
    assert_eq!(loaded.timeline(), cube.timeline());
    assert_eq!(loaded.subjects(), cube.subjects());
    assert_eq!(loaded.group_members("Control"), vec![0, 2]);
}

#[test]
fn f32_cube_without_groups() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("f32.safetensors");
    let tl = timeline();
    let s2: Vec<f32> = (0..2 * tl.len() * 3 * 2).map(|i| i as f32).collect();
    let time: Vec<f32> = tl.iter().map(|&t| t as f32).collect();

    let mut w = StWriter::new();
    w.add_f32("s2", &s2, &[2, tl.len(), 3, 2]);
    w.add_f32("time", &time, &[tl.len()]);
    w.add_strings("subjects", &["A".to_string(), "B".to_string()]).unwrap();
    w.write(&path).unwrap();

    let cube = load_cube(&path, "", "group").unwrap();
    assert_eq!(cube.dims(), (2, tl.len(), 3, 2));
    assert!(cube.groups().is_none());
    assert_eq!(cube.s2()[[1, 0, 0, 0]], (tl.len() * 3 * 2) as f64);
}

#[test]
fn missing_member_reports_key() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.safetensors");
    let mut w = StWriter::new();
    w.add_f64(&member_key("Data_All", "time"), &[0.0, 1.0], &[2]);
    w.write(&path).unwrap();

    let err = load_cube(&path, "Data_All", "group").unwrap_err();
    assert!(err.to_string().contains("Data_All.s2"), "{err}");
}

#[test]
fn inconsistent_subject_count_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.safetensors");
    let s2 = Array4::<f64>::zeros((2, 3, 1, 1));
    let mut w = StWriter::new();
    w.add_f64_arr4("s2", &s2);
    w.add_f64("time", &[0.0, 1.0, 2.0], &[3]);
    w.add_strings("subjects", &["only-one".to_string()]).unwrap();
    w.write(&path).unwrap();

    assert!(load_cube(&path, "", "group").is_err());
}

#[test]
fn config_drives_loading() {
    let dir = tempfile::tempdir().unwrap();
    write_cube(&synthetic_cube(), "Data_All", "group", &dir.path().join("study.safetensors")).unwrap();
    let cfg_path = dir.path().join("config.toml");
    std::fs::write(
        &cfg_path,
        "mat_filename = \"study.safetensors\"\ndata_attr_name = \"Data_All\"\nlegacy_mode = false\n",
    )
    .unwrap();

    let cfg = AnalysisConfig::load(&cfg_path).unwrap();
    let cube = cfg.load_cube().unwrap();
    assert_eq!(cube.subjects(), SUBJECTS.map(String::from).as_slice());
    let sig = AveragedSignal::new(&cube, "S02", Selector::Range(1, 3), Selector::Fixed(1))
        .unwrap()
        .fit_with(cfg.nan_policy());
    assert_eq!(sig.len(), cube.n_samples());
}

/// Write a raw file: 8-byte header length, header bytes, payload.
fn write_raw(path: &std::path::Path, declared_len: u64, header: &[u8], payload: &[u8]) {
    let mut bytes = declared_len.to_le_bytes().to_vec();
    bytes.extend_from_slice(header);
    bytes.extend_from_slice(payload);
    std::fs::write(path, bytes).unwrap();
}

#[test]
fn huge_header_length_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("huge.safetensors");
    write_raw(&path, u64::MAX, b"{}", &[]);
    let err = load_cube(&path, "", "group").unwrap_err();
    assert!(err.to_string().contains("header"), "{err}");
}

#[test]
fn overflowing_data_offsets_are_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("offsets.safetensors");
    let header = format!(
        r#"{{"s2":{{"dtype":"F64","shape":[1,1,1,1],"data_offsets":[{},{}]}}}}"#,
        u64::MAX - 2,
        u64::MAX
    );
    write_raw(&path, header.len() as u64, header.as_bytes(), &[0u8; 8]);
    let err = load_cube(&path, "", "group").unwrap_err();
    assert!(err.to_string().contains("'s2'"), "{err}");
}

#[test]
fn overflowing_shape_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shape.safetensors");
    let header = format!(
        r#"{{"s2":{{"dtype":"F64","shape":[{big},{big},2,2],"data_offsets":[0,8]}}}}"#,
        big = u64::MAX / 2
    );
    write_raw(&path, header.len() as u64, header.as_bytes(), &[0u8; 8]);
    let err = load_cube(&path, "", "group").unwrap_err();
    assert!(err.to_string().contains("overflows"), "{err}");
}

#[test]
fn strings_that_cannot_round_trip_are_rejected() {
    let mut w = StWriter::new();
    assert!(w.add_strings("subjects", &["S01".to_string(), String::new()]).is_err());
    assert!(w.add_strings("subjects", &["S0\n1".to_string()]).is_err());
    assert!(w.add_strings("subjects", &["S01".to_string(), "S02".to_string()]).is_ok());
}

#[test]
fn duplicate_subjects_not_written() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dup.safetensors");
    let cube = DataCube::new(
        Array4::zeros((2, 2, 1, 1)),
        ndarray::Array1::zeros(2),
        vec!["S01".to_string(), "S01".to_string()],
    )
    .unwrap();
    let err = write_cube(&cube, "Data_All", "group", &path).unwrap_err();
    assert!(err.to_string().contains("duplicate subject id 'S01'"), "{err}");
    assert!(!path.exists());
}

#[test]
fn duplicate_tensor_names_not_written() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("names.safetensors");
    let mut w = StWriter::new();
    w.add_f64("time", &[0.0], &[1]);
    w.add_f64("time", &[1.0], &[1]);
    assert!(w.write(&path).is_err());
}
