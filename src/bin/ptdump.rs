use std::{env::args, process::exit};

use log::error;
use ptdump::Config;

fn main() {
    env_logger::init();

    let result = Config::from_args(args().skip(1)).and_then(|cfg| cfg.run());
    match result {
        Ok(out) => print!("{out}"),
        Err(e) => {
            error!("{e:?}");
            eprintln!("ptdump: {e}");
            exit(1);
        }
    }
}
