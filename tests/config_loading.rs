// tests/config_loading.rs

use std::io::Write;
use std::path::PathBuf;

use dib2cloud::config::{load_and_validate, load_from_path};
use dib2cloud::errors::Dib2CloudError;
use tempfile::NamedTempFile;

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn full_config_is_loaded() {
    let file = write_config(
        r#"
build_processfile_dir = "/srv/dib2cloud/run/builds"
upload_processfile_dir = "/srv/dib2cloud/run/uploads"
buildlog_dir = "/srv/dib2cloud/logs"
images_dir = "/srv/dib2cloud/images"
build_tool = "/opt/dib/bin/disk-image-create"

[[diskimages]]
name = "ubuntu-minimal"
elements = ["ubuntu-minimal", "simple-init"]
release = "noble"
formats = ["qcow2", "raw"]

[diskimages.env_vars]
DIB_CLOUD_INIT_DATASOURCES = "OpenStack"

[[providers]]
name = "test_provider"
cloud = "dib2cloud_test"
"#,
    );

    let cfg = load_and_validate(file.path()).unwrap();
    assert_eq!(cfg.build_processfile_dir, PathBuf::from("/srv/dib2cloud/run/builds"));
    assert_eq!(cfg.images_dir, PathBuf::from("/srv/dib2cloud/images"));
    assert_eq!(cfg.build_tool, "/opt/dib/bin/disk-image-create");
    assert_eq!(cfg.upload_tool, "openstack");

    let image = cfg.diskimage("ubuntu-minimal").unwrap();
    assert_eq!(image.elements, vec!["ubuntu-minimal", "simple-init"]);
    assert_eq!(image.release.as_deref(), Some("noble"));
    assert_eq!(image.formats, vec!["qcow2", "raw"]);
    assert_eq!(
        image.env_vars.get("DIB_CLOUD_INIT_DATASOURCES").map(String::as_str),
        Some("OpenStack")
    );

    assert_eq!(cfg.provider("test_provider").unwrap().cloud, "dib2cloud_test");
}

#[test]
fn diskimage_formats_default_to_qcow2() {
    let file = write_config(
        r#"
[[diskimages]]
name = "centos"
elements = ["centos", "vm"]
"#,
    );

    let cfg = load_and_validate(file.path()).unwrap();
    assert_eq!(cfg.diskimage("centos").unwrap().formats, vec!["qcow2"]);
    assert!(cfg.diskimage("centos").unwrap().release.is_none());
}

#[test]
fn missing_file_yields_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let raw = load_from_path(dir.path().join("absent.toml")).unwrap();

    assert_eq!(raw.build_tool, "disk-image-create");
    assert!(raw.diskimages.is_empty());
    assert!(raw.providers.is_empty());
    assert!(raw.build_processfile_dir.ends_with(".dib2cloud/run/builds"));
    assert!(raw.upload_processfile_dir.ends_with(".dib2cloud/run/uploads"));
}

#[test]
fn duplicate_provider_names_are_rejected() {
    let file = write_config(
        r#"
[[providers]]
name = "p"
cloud = "one"

[[providers]]
name = "p"
cloud = "two"
"#,
    );

    assert!(matches!(
        load_and_validate(file.path()),
        Err(Dib2CloudError::ConfigError(_))
    ));
}

#[test]
fn malformed_toml_is_a_parse_error() {
    let file = write_config("[[diskimages]\nname = ");

    assert!(matches!(
        load_from_path(file.path()),
        Err(Dib2CloudError::TomlError(_))
    ));
}

#[test]
fn unknown_names_are_reported_by_kind() {
    let file = write_config("");
    let cfg = load_and_validate(file.path()).unwrap();

    assert!(matches!(
        cfg.diskimage("nope"),
        Err(Dib2CloudError::UnknownDiskimage(name)) if name == "nope"
    ));
    assert!(matches!(
        cfg.provider("nope"),
        Err(Dib2CloudError::UnknownProvider(name)) if name == "nope"
    ));
}
