// Layered grid benchmark - measures set/get cost as history grows, with and
// without compaction on read.

use std::time::Instant;

use lineage::Options;
use lineage::layered::LayeredGrid;

const SIDE: usize = 256;

fn run(label: &str, options: Options) {
    println!("\n=== {} ===", label);
    let root = LayeredGrid::with_options(SIDE, SIDE, 0u32, options).unwrap();
    let edits = 5_000;

    // Linear history, dropping each intermediate snapshot.
    let start = Instant::now();
    let mut tip = root.clone();
    for i in 0..edits {
        let x = (i * 31) % SIDE;
        let y = (i * 17) % SIDE;
        tip = tip.set(x, y, i as u32 + 1).unwrap();
    }
    let set_time = start.elapsed();
    println!("  {} sets: {:?}", edits, set_time);
    println!("  per call: {:?}", set_time / edits as u32);
    println!("  depth after sets: {}", tip.depth());

    let start = Instant::now();
    let mut sum = 0u64;
    for i in 0..edits {
        sum += tip.get(i % SIDE, (i / SIDE) % SIDE).unwrap() as u64;
    }
    let get_time = start.elapsed();
    println!("  {} gets: {:?} (checksum {})", edits, get_time, sum);
    println!("  per call: {:?}", get_time / edits as u32);

    tip.compact();
    println!("  depth after compact: {}", tip.depth());
    println!("  stats: {:?}", tip.stats());

    // Many mutable writes, frozen every hundred.
    let start = Instant::now();
    let mut editor = root.to_mutable();
    let mut frozen = Vec::new();
    for i in 0..edits {
        editor.modify(i % SIDE, (i / 7) % SIDE, i as u32).unwrap();
        if i % 100 == 99 {
            frozen.push(editor.freeze());
        }
    }
    let modify_time = start.elapsed();
    println!("  {} modifies, {} snapshots: {:?}", edits, frozen.len(), modify_time);
    println!("  per call: {:?}", modify_time / edits as u32);
}

fn main() {
    run("compact on read", Options::default());
    run("compact on demand", Options { compact_on_read: false, ..Options::default() });
}
