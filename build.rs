// build.rs - stamp the build time for --version and the startup banner

use chrono::Utc;
use std::{env, fs, io, path::PathBuf};

fn main() -> io::Result<()> {
    let out_dir = PathBuf::from(env::var_os("OUT_DIR").ok_or_else(|| io::Error::other("OUT_DIR not set"))?);
    let build_date = Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string();

    // const for include!, env var for concat! in clap attributes
    fs::write(
        out_dir.join("build_info.rs"),
        format!("pub const BUILD_DATE: &str = \"{build_date}\";\n"),
    )?;
    println!("cargo:rustc-env=BUILD_DATE={build_date}");
    println!("cargo:rerun-if-changed=build.rs");
    Ok(())
}
