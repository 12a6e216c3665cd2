use super::*;
use clap::CommandFactory;

#[test]
fn verify_cli_args() {
    Cli::command().debug_assert();
}

#[test]
fn test_changes_reject_requires_reason() {
    assert!(Cli::try_parse_from(["ontoforge", "changes", "reject", "3"]).is_err());
    let cli =
        Cli::try_parse_from(["ontoforge", "changes", "reject", "3", "--reason", "renamed"]).unwrap();
    match cli.command {
        Commands::Changes(ChangesArgs {
            command: ChangesCommands::Reject { id, reason },
        }) => {
            assert_eq!(id, 3);
            assert_eq!(reason, "renamed");
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn test_global_flags_after_subcommand() {
    let cli = Cli::try_parse_from([
        "ontoforge",
        "status",
        "--output",
        "json",
        "-o",
        "0b6e1a2c-5d8f-4c1e-9a3b-7f2d4e6c8a10",
    ])
    .unwrap();
    assert_eq!(cli.global.output, OutputFormat::Json);
    assert!(cli.global.ontology.is_some());
}

#[test]
fn test_status_filter_values() {
    let cli =
        Cli::try_parse_from(["ontoforge", "changes", "list", "--status", "auto-applied"]).unwrap();
    assert!(matches!(
        cli.command,
        Commands::Changes(ChangesArgs {
            command: ChangesCommands::List {
                status: Some(StatusFilter::AutoApplied)
            }
        })
    ));
}
