use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        StrataError::validation("x")
            .to_string()
            .contains("validation error:")
    );
    assert!(
        StrataError::allocation("x")
            .to_string()
            .contains("allocation failure:")
    );
    assert!(
        StrataError::serde("x")
            .to_string()
            .contains("serialization error:")
    );
    assert!(
        StrataError::playback("x")
            .to_string()
            .contains("playback error:")
    );
}

#[test]
fn upstream_and_compute_name_the_node() {
    let err = StrataError::upstream("Blur1", "input 0 is not connected");
    let msg = err.to_string();
    assert!(msg.contains("Blur1"));
    assert!(msg.contains("input 0 is not connected"));

    let err = StrataError::compute("Grade2", "bad pixel");
    assert!(err.to_string().starts_with("compute failure in 'Grade2'"));
}

#[test]
fn io_error_mentions_path() {
    let err = StrataError::io(
        "/tmp/cache/toc.json",
        std::io::Error::new(std::io::ErrorKind::NotFound, "file not found"),
    );
    let msg = err.to_string();
    assert!(msg.contains("cache I/O error"));
    assert!(msg.contains("toc.json"));
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = StrataError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}
