/*
 *  Copyright (C) 2025  Markus Elias Gerber
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
 *  You should have received a copy of the GNU General Public License
 *  along with this program.  If not, see <https://www.gnu.org/licenses/>.
 */

use std::{env, path::PathBuf, process::ExitCode};

use env_logger::{Builder, Env};
use log::{error, info};
use offheap::{MapOptions, MappedFile, ResourceHandler};

const DEFAULT_CAPACITY: i64 = 10_000;

fn run(path: PathBuf, offset: i64, capacity: i64) -> offheap::Result<()> {
    let mapped = MappedFile::map_with_options(&path, offset, capacity, MapOptions::default())?;
    info!(
        "Mapped '{}': capacity={} pages={} read_only={}",
        path.display(),
        mapped.capacity(),
        mapped.page_count(),
        mapped.is_read_only()
    );

    info!("Loaded before load(): {}", mapped.is_loaded()?);
    mapped.load()?;
    info!("Loaded after load(): {}", mapped.is_loaded()?);

    mapped.close()?;
    info!("Closed, state valid: {}", mapped.state().is_valid());

    Ok(())
}

fn main() -> ExitCode {
    Builder::from_env(Env::default().default_filter_or("info"))
        .format_module_path(false)
        .init();

    let mut args = env::args().skip(1);
    let path = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| env::temp_dir().join("offheap_map_demo.data"));
    let offset = args.next().and_then(|x| x.parse().ok()).unwrap_or(0);
    let capacity = args.next().and_then(|x| x.parse().ok()).unwrap_or(DEFAULT_CAPACITY);

    match run(path, offset, capacity) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{}", err);
            ExitCode::FAILURE
        }
    }
}
