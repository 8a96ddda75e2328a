/*
 *  build.rs
 *
 *  LyRing - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Stamps the build time into OUT_DIR/build_info.rs for the startup banner
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use chrono::Utc;
use std::env;
use std::error::Error;
use std::fs;
use std::path::PathBuf;

fn main() -> Result<(), Box<dyn Error>> {
    let target = PathBuf::from(env::var("OUT_DIR")?).join("build_info.rs");
    let stamp = Utc::now().format("%Y-%m-%d %H:%M:%S UTC");

    fs::write(&target, format!("pub const BUILD_DATE: &str = \"{stamp}\";\n"))?;

    // stamp refreshes whenever the build script itself is touched
    println!("cargo:rerun-if-changed=build.rs");
    Ok(())
}
