//! AFL fuzz harness for versioned vectors and layered grids
//!
//! Every input is replayed against full-copy containers; any disagreement
//! panics. Reproduce a crash with `cargo run --features oracle --bin
//! repro_crash -- <crash_file>`.

use afl::fuzz;

fn main() {
    fuzz!(|data: &[u8]| {
        lineage::fuzz::run(data, |_, _| {});
    });
}
