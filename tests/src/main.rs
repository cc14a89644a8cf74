mod managed_lanes;
mod project_cards;
mod selection;

use structopt::StructOpt;

fn run_all(t: &mut runner::TestRunner) {
    selection::run(t);
    managed_lanes::run(t);
    project_cards::run(t);
}

fn main() {
    netutil::logger::setup();
    let mut t = runner::TestRunner::new(runner::Flags::from_args());
    run_all(&mut t);
    let failed = t.done();
    if !failed.is_empty() {
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_scenarios_pass() {
        let mut t = runner::TestRunner::new(runner::Flags::default());
        run_all(&mut t);
        let failed = t.done();
        assert!(failed.is_empty(), "failed: {:?}", failed);
    }
}
