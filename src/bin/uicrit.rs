use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    uicrit::apps::run(std::env::args().skip(1))
}
