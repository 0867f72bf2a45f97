// SPDX-License-Identifier: MPL-2.0

//! Platform shells. Only Windows offers the capture and composition APIs the
//! gag needs; elsewhere the binary exits with an explanation.

#[cfg(windows)]
mod windows;

#[cfg(windows)]
pub use self::windows::run;

#[cfg(not(windows))]
pub fn run(
    _config: &visitor_gag_config::Config,
    _path: Option<std::path::PathBuf>,
) -> crate::error::Result<()> {
    Err(crate::error::Error::Unsupported("screen capture"))
}
