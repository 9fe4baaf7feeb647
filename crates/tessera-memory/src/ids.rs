// SPDX-FileCopyrightText: 2026 Tessera Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Write id generation.

use rand::Rng;
use rand::distributions::Alphanumeric;

const SUFFIX_LEN: usize = 9;

/// Generates a process-unique write id of the form `mem_<millis>_<random>`.
///
/// Shared by the vector item and the episode of one `remember` call.
pub fn generate_write_id() -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SUFFIX_LEN)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect();
    format!("mem_{millis}_{suffix}")
}
