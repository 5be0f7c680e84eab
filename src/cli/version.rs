use degov::governance::SNAPSHOT_SCHEMA_VERSION;

/// Display version information
pub fn execute() {
    println!("degov {}", env!("CARGO_PKG_VERSION"));
    println!("Proposal and vote store for a governance agent");
    println!("Snapshot schema: v{}", SNAPSHOT_SCHEMA_VERSION);
}
