use clap::{ArgAction, Parser};
use lectio_author::{AuthorError, AuthorResult, ChangeSpec};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "lectio-author")]
#[command(about = "Author a Lectio dataset update manifest")]
#[command(disable_version_flag = true)]
pub struct Cli {
    /// Target dataset version. Never inferred; coordinate with the release.
    #[arg(long = "version", value_name = "N")]
    pub version: i64,

    #[arg(long)]
    pub description: String,

    #[arg(long = "created-by", default_value = "lectio-author")]
    pub created_by: String,

    #[arg(long = "out-dir", default_value = ".")]
    pub out_dir: PathBuf,

    /// Extra table to accept besides the bundled dataset tables.
    #[arg(long = "allow-table", value_name = "TABLE")]
    pub allow_tables: Vec<String>,

    #[arg(long)]
    pub table: Option<String>,

    #[arg(long)]
    pub operation: Option<String>,

    #[arg(long = "where", value_name = "K=V,...")]
    pub where_clause: Option<String>,

    #[arg(long = "set", visible_alias = "data", value_name = "K=V,...")]
    pub data: Option<String>,

    /// Shorthand update group; may be repeated.
    #[arg(
        long = "update",
        num_args = 3,
        value_names = ["TABLE", "WHERE", "DATA"],
        action = ArgAction::Append
    )]
    pub updates: Vec<String>,

    /// Print the summary without writing the manifest.
    #[arg(long = "dry-run")]
    pub dry_run: bool,
}

impl Cli {
    /// Collect the explicit group (if any) followed by every `--update` group.
    pub fn change_specs(&self) -> AuthorResult<Vec<ChangeSpec>> {
        let mut specs = Vec::new();

        match (&self.table, &self.operation) {
            (Some(table), Some(operation)) => specs.push(ChangeSpec {
                table: table.clone(),
                operation: operation.clone(),
                where_clause: self.where_clause.clone(),
                data: self.data.clone(),
            }),
            (Some(_), None) => return Err(AuthorError::MissingArgument("--operation".into())),
            (None, _) => {
                if self.operation.is_some() || self.where_clause.is_some() || self.data.is_some() {
                    return Err(AuthorError::MissingArgument("--table".into()));
                }
            }
        }

        for group in self.updates.chunks_exact(3) {
            specs.push(ChangeSpec::update(&group[0], &group[1], &group[2]));
        }
        Ok(specs)
    }
}
