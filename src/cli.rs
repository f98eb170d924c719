use clap::{Parser, Subcommand};
use chrono::NaiveDate;
use std::path::PathBuf;

use schooldesk::models::Resource;

#[derive(Parser)]
#[command(name = "schooldesk")]
#[command(about = "Command line client for the school management API")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Log in and store the session token
    Login {
        #[arg(short, long)]
        username: String,

        /// Password (prompted on stdin when omitted)
        #[arg(short, long)]
        password: Option<String>,
    },

    /// Forget the stored session
    Logout,

    /// Show the logged in user
    Whoami,

    /// List a collection (classes, students, fees, ...)
    List {
        #[arg(value_parser = parse_resource)]
        resource: Resource,

        /// Case-insensitive search over the resource's search fields
        #[arg(short, long)]
        search: Option<String>,

        #[arg(short, long, default_value = "1")]
        page: usize,

        /// Rows per page (defaults to SCHOOLDESK_PAGE_SIZE)
        #[arg(long)]
        page_size: Option<usize>,
    },

    /// Show every field of one record
    Show {
        #[arg(value_parser = parse_resource)]
        resource: Resource,
        id: i64,
    },

    /// Create a record from field=value pairs
    Create {
        #[arg(value_parser = parse_resource)]
        resource: Resource,

        #[arg(long = "set", value_name = "FIELD=VALUE")]
        set: Vec<String>,
    },

    /// Update a record; unspecified fields keep their current values
    Update {
        #[arg(value_parser = parse_resource)]
        resource: Resource,
        id: i64,

        #[arg(long = "set", value_name = "FIELD=VALUE")]
        set: Vec<String>,
    },

    /// Delete a record
    Delete {
        #[arg(value_parser = parse_resource)]
        resource: Resource,
        id: i64,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Upload a document file
    Upload {
        #[arg(short, long)]
        title: String,

        #[arg(short, long)]
        file: PathBuf,
    },

    /// Fee balances and collection summary
    Fees {
        /// Reference date for overdue fees (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },

    /// Weekly timetable
    Timetable {
        /// Class id or class name
        #[arg(short, long)]
        class: Option<String>,
    },

    /// Overview counts, fee summary and recent notices
    Dashboard {
        /// Fail when any collection cannot be loaded
        #[arg(long)]
        strict: bool,
    },

    /// Export a collection to CSV
    Export {
        #[arg(value_parser = parse_resource)]
        resource: Resource,

        #[arg(short, long)]
        output: PathBuf,

        #[arg(short, long)]
        search: Option<String>,
    },

    /// Launch the terminal UI
    Tui,
}

pub fn parse_resource(name: &str) -> Result<Resource, String> {
    Resource::parse(name).ok_or_else(|| {
        let known: Vec<&str> = Resource::ALL.iter().map(|r| r.as_str()).collect();
        format!("unknown resource '{}'. Expected one of: {}", name, known.join(", "))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_list_command() {
        let cli = Cli::try_parse_from(["schooldesk", "list", "classes", "--search", "form", "--page", "2"]).unwrap();
        match cli.command {
            Commands::List { resource, search, page, page_size } => {
                assert_eq!(resource, Resource::Classes);
                assert_eq!(search.as_deref(), Some("form"));
                assert_eq!(page, 2);
                assert_eq!(page_size, None);
            }
            _ => panic!("expected list command"),
        }
    }

    #[test]
    fn test_repeated_set_arguments() {
        let cli = Cli::try_parse_from([
            "schooldesk", "create", "subjects", "--set", "name=Maths", "--set", "code=MTH",
        ])
        .unwrap();
        match cli.command {
            Commands::Create { set, .. } => assert_eq!(set, vec!["name=Maths", "code=MTH"]),
            _ => panic!("expected create command"),
        }
    }

    #[test]
    fn test_unknown_resource_is_rejected() {
        assert!(Cli::try_parse_from(["schooldesk", "list", "spaceships"]).is_err());
        assert!(parse_resource("spaceships").unwrap_err().contains("classes"));
    }
}
