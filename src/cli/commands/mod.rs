pub mod logging;
pub mod portal;

use clap::{
    builder::styling::{AnsiColor, Effects, Styles},
    Arg, ColorChoice, Command,
};

pub const ARG_PORT: &str = "port";
pub const ARG_DSN: &str = "dsn";
pub const ARG_IDENTITIES: &str = "identities";
pub const CMD_HASH_PASSWORD: &str = "hash-password";

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let long_version: &'static str = Box::leak(
        format!("{} - {}", env!("CARGO_PKG_VERSION"), crate::GIT_COMMIT_HASH).into_boxed_str(),
    );

    let command = Command::new("patient-portal")
        .about("Patient portal: login, appointments and enrollment")
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .subcommand_negates_reqs(true)
        .subcommand(
            Command::new(CMD_HASH_PASSWORD)
                .about("Read a password from stdin and print its Argon2id PHC hash"),
        )
        .arg(
            Arg::new(ARG_PORT)
                .short('p')
                .long(ARG_PORT)
                .help("Port to listen on")
                .default_value("8080")
                .env("PORTAL_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new(ARG_DSN)
                .short('d')
                .long(ARG_DSN)
                .help("Database connection string")
                .long_help(
                    "Database connection string. The pool connects lazily, so the portal starts while the database is down.",
                )
                .env("PORTAL_DSN")
                .required(true),
        )
        .arg(
            Arg::new(ARG_IDENTITIES)
                .short('i')
                .long(ARG_IDENTITIES)
                .help("JSON file with the patient identities and their Argon2id hashes")
                .env("PORTAL_IDENTITIES")
                .required(true),
        );

    let command = portal::with_args(command);
    logging::with_args(command)
}
