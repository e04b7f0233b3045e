//! Bootpush command line interface.

use std::process;

use clap::{crate_description, crate_name, crate_version, App, AppSettings::*, Arg};
use log::{debug, trace, LevelFilter};
use simplelog::*;

use bootpush as bp;

fn main() {
    println!("[BP] bootpush v{}", crate_version!());

    ctrlc::set_handler(move || {
        println!("🛑 received Ctrl+C!");
        process::exit(0);
    })
    .expect("Failed to install my Ctrl-C handler!");

    let matches = App::new(crate_name!())
        .version(format!("v{}", crate_version!()).as_str())
        .about(crate_description!())
        .long_about(
            "\n\
            Bootpush works in tandem with the boot ROM of a device to push a \
            boot image over ethernet. When started, it binds the well-known \
            BOOTME port and waits for the device to announce itself.\n\
            \n\
            When the device broadcasts its BOOTME announcement, bootpush \
            answers it directly: \n\
               \t* sends a write request and the image manifest \n\
               \t* sends a second write request for the image itself \n\
               \t* pushes the image in 512 byte chunks, each one \
            acknowledged by the device \n\
               \t* tells the device to jump into the received image \n\
            \n\
            Every exchange is strictly lockstep and the boot ROM expects a \
            single synchronous exchange, so there is no timeout and no \
            retry: a device that stops answering leaves bootpush waiting \
            until it is interrupted with Ctrl+C. A failed run must be fully \
            repeated by resetting the device so it broadcasts a fresh \
            BOOTME.\
        ",
        )
        .max_term_width(80)
        .setting(ColoredHelp)
        .setting(NextLineHelp)
        .arg(
            Arg::with_name("IMAGE")
                .help("path to the image to be pushed")
                .long_help(
                    "path to the image to be pushed; when not set, \
                     `bootpush` pushes `nk.nb0` from the current working \
                     directory.",
                )
                .index(1),
        )
        .arg(Arg::with_name("v").short("v").multiple(true).help(
            "Sets the logging level of verbosity, repeat several times for \
                higher verbosity",
        ))
        .get_matches();

    // Vary the output based on how many times the user used the "verbose"
    // flag (i.e. 'bootpush -v -v -v' or 'bootpush -vvv' vs 'bootpush -v'
    let log_level: LevelFilter;
    match matches.occurrences_of("v") {
        0 => log_level = LevelFilter::Warn,
        1 => log_level = LevelFilter::Info,
        2 => log_level = LevelFilter::Debug,
        _ => log_level = LevelFilter::Trace,
    }

    TermLogger::init(
        log_level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )
    .unwrap();

    trace!("{:#?}", matches);

    let mut settings = bp::SettingsBuilder::default().finalize();

    if matches.is_present("IMAGE") {
        settings.image = Some(matches.value_of("IMAGE").unwrap().into());
    }

    // Run the state machine ===================================================

    let mut ppsm = bp::factory(settings);
    let exit_code = ppsm.run();
    debug!("exit code: {}", exit_code);
    std::process::exit(exit_code.into());
}
