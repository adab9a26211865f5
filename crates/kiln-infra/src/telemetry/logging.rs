// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use env_logger::{Builder, Env};
use log::LevelFilter;

/// Installs the global logger. `RUST_LOG` overrides `default_level`.
///
/// Does nothing when a logger is already installed.
pub fn init_logging(default_level: LevelFilter) {
    let filter = default_level.as_str().to_ascii_lowercase();
    if Builder::from_env(Env::default().default_filter_or(filter))
        .try_init()
        .is_err()
    {
        log::debug!("A logger is already installed");
    }
}

/// Logger for tests: output is captured by the test harness.
pub fn init_test_logging() {
    let _ = Builder::from_env(Env::default().default_filter_or("debug"))
        .is_test(true)
        .try_init();
}
