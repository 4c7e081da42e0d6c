/// Display version information
pub fn execute() {
    println!("tally {}", env!("CARGO_PKG_VERSION"));
    println!("Operator CLI for the tally poll ledger");
    println!(
        "Polls: {}-{} options, one vote per identity",
        tally::poll::MIN_OPTIONS,
        tally::poll::MAX_OPTIONS
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_execute() {
        // Version command should not panic
        execute();
    }
}
