mod build_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

/// Returns the main version identifier, e.g. `v0.4`.
pub(crate) fn identifier() -> String {
    let digits = build_info::PKG_VERSION.strip_suffix(".0")
        .unwrap_or(build_info::PKG_VERSION);

    format!("v{digits}")
}

/// Returns an RFC 2822 formatted date of the build time in UTC.
pub(crate) fn build_time_utc() -> &'static str {
    build_info::BUILT_TIME_UTC
}

/// Returns a string containing all version-related information.
pub(crate) fn full() -> String {
    format!(
        "{} ({} build, rustc {}), built {}",
        identifier(),
        build_info::PROFILE,
        build_info::RUSTC_VERSION,
        build_time_utc(),
    )
}
