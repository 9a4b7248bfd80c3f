use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    sop_pairs::apps::run_build_instances(std::env::args().skip(1))
}
