use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use textseek_core::{Dialect, TupleCompare};
use textseek_storage::{explain, load_documents, InMemoryStore, SearchRequest, SearchService};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "textseek")]
#[command(about="Full-text search over a JSON-lines document file", long_about=None)]
struct Cli {
    /// Documents, one JSON object per line.
    #[arg(long, global = true)]
    data: Option<PathBuf>,
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Keyword search ranked by view count.
    Search {
        keyword: String,
        #[arg(long)]
        min_views: Option<u64>,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// One page of a recency-ordered keyword search.
    Page {
        keyword: String,
        #[arg(long)]
        cursor: Option<String>,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Documents carrying a tag.
    Tags {
        tag: String,
        #[arg(long)]
        keyword: Option<String>,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Distinct titles starting with a prefix.
    Suggest {
        prefix: String,
        #[arg(long, default_value_t = 5)]
        limit: usize,
    },
    /// Print the SQL a request would run. Takes the request as JSON.
    Explain {
        request: String,
        #[arg(long, default_value = "pgroonga")]
        dialect: String,
        #[arg(long)]
        table: Option<String>,
        /// Spell out keyset comparisons instead of row values.
        #[arg(long)]
        expanded: bool,
    },
}

fn service(data: Option<&PathBuf>) -> Result<SearchService> {
    let Some(path) = data else {
        bail!("--data is required for this command");
    };
    let docs = load_documents(path).with_context(|| format!("loading {}", path.display()))?;
    Ok(SearchService::new(Arc::new(InMemoryStore::from_documents(
        docs,
    ))))
}

fn print(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Cmd::Search {
            keyword,
            min_views,
            limit,
        } => {
            let docs = service(cli.data.as_ref())?
                .search(&keyword, min_views, limit)
                .await?;
            print(&docs)?;
        }
        Cmd::Page {
            keyword,
            cursor,
            limit,
        } => {
            let page = service(cli.data.as_ref())?
                .search_paginated_token(&keyword, cursor.as_deref(), limit)
                .await?;
            print(&page)?;
        }
        Cmd::Tags {
            tag,
            keyword,
            limit,
        } => {
            let docs = service(cli.data.as_ref())?
                .search_by_tags(&tag, keyword.as_deref(), limit)
                .await?;
            print(&docs)?;
        }
        Cmd::Suggest { prefix, limit } => {
            let titles = service(cli.data.as_ref())?.suggest(&prefix, limit).await?;
            print(&titles)?;
        }
        Cmd::Explain {
            request,
            dialect,
            table,
            expanded,
        } => {
            let request: SearchRequest =
                serde_json::from_str(&request).context("parsing request JSON")?;
            let Some(mut dialect) = Dialect::named(&dialect) else {
                bail!("unknown dialect `{dialect}`");
            };
            if let Some(table) = table {
                dialect = dialect.with_table(table)?;
            }
            if expanded {
                dialect = dialect.with_tuple_compare(TupleCompare::Expanded);
            }
            let rendered = explain(&request, &dialect)?;
            println!("{}", rendered.sql);
            print(&rendered.params)?;
        }
    }
    Ok(())
}
