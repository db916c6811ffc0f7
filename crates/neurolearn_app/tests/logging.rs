use std::io;

use log::LevelFilter;
use neurolearn_app::platform::logging::{initialize, LogDestination, LogOptions};
use tempfile::TempDir;

#[test]
fn default_options_log_info_to_the_working_directory() {
    let options = LogOptions::default();
    assert_eq!(options.destination, LogDestination::File);
    assert_eq!(options.file.to_str(), Some("./neurolearn.log"));
    assert_eq!(options.level(), LevelFilter::Info);
}

#[test]
fn unusable_log_path_is_reported() {
    let dir = TempDir::new().unwrap();
    let options = LogOptions {
        destination: LogDestination::File,
        file: dir.path().join("missing").join("neurolearn.log"),
        verbose: false,
    };

    let err = initialize(&options).unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::NotFound);
    assert!(err.to_string().contains("could not create log file"));
}
