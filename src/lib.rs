/*
 * SPDX-FileCopyrightText: 2023 Tommaso Fontana
 * SPDX-FileCopyrightText: 2023 Inria
 * SPDX-FileCopyrightText: 2023 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

#![doc = include_str!("../README.md")]
#![deny(unconditional_recursion)]

pub mod bucketers;
pub mod stats;
pub mod traits;
pub mod utils;

pub mod prelude {
    pub use crate::bucketers::*;
    pub use crate::stats::*;
    pub use crate::traits::*;
    pub use crate::utils::*;
}

/// Initializes the `env_logger` logger with a custom format including
/// timestamps with elapsed time since initialization.
pub fn init_env_logger() -> anyhow::Result<()> {
    use std::io::Write;
    use std::time::Instant;

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));

    let start = Instant::now();
    builder.format(move |buf, record| {
        let elapsed = start.elapsed();
        writeln!(
            buf,
            "{:>4}.{:03}s {} [{}] {}",
            elapsed.as_secs(),
            elapsed.subsec_millis(),
            record.level(),
            record.target(),
            record.args()
        )
    });
    builder.try_init()?;
    Ok(())
}
