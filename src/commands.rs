//! Command-line actions. Each prints pretty JSON to the given writer.

use anyhow::{Context, Result};
use futures_util::{StreamExt, pin_mut};
use log::debug;
use serde::Serialize;
use std::io::Write;

use crate::client::CompaniesHouseClient;
use crate::http::Transport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum SearchKind {
    #[default]
    Companies,
    Officers,
    All,
}

fn print_json<W: Write, S: Serialize>(out: &mut W, value: &S) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, value).context("Failed to serialize output")?;
    writeln!(out)?;
    Ok(())
}

/// Runs a single-page search.
#[tracing::instrument(skip(client, out))]
pub async fn search<T: Transport, W: Write>(
    client: &CompaniesHouseClient<T>,
    out: &mut W,
    query: &str,
    kind: SearchKind,
    per_page: Option<u32>,
    start_index: u32,
) -> Result<()> {
    let per_page = per_page.unwrap_or_else(|| client.items_per_page());
    match kind {
        SearchKind::Companies => {
            let page = client.search_companies(query, per_page, start_index).await?;
            print_json(out, &page)
        }
        SearchKind::Officers => {
            let page = client.search_officers(query, per_page, start_index).await?;
            print_json(out, &page)
        }
        SearchKind::All => {
            let page = client.search_all(query, per_page, start_index).await?;
            print_json(out, &page)
        }
    }
}

/// Walks every page of a combined search, printing each page as it arrives.
#[tracing::instrument(skip(client, out))]
pub async fn search_all<T: Transport, W: Write>(
    client: &CompaniesHouseClient<T>,
    out: &mut W,
    query: &str,
    per_page: Option<u32>,
    max_pages: Option<u32>,
) -> Result<()> {
    let per_page = per_page.unwrap_or_else(|| client.items_per_page());
    let pages = client.search_all_pages(query, per_page, max_pages);
    pin_mut!(pages);

    let mut count = 0;
    while let Some(page) = pages.next().await {
        print_json(out, &page?)?;
        count += 1;
    }
    debug!("Printed {} page(s)", count);
    Ok(())
}

#[tracing::instrument(skip(client, out))]
pub async fn company<T: Transport, W: Write>(
    client: &CompaniesHouseClient<T>,
    out: &mut W,
    number: &str,
) -> Result<()> {
    let company = client.get_company(number).await?;
    print_json(out, &company)
}

#[tracing::instrument(skip(client, out))]
pub async fn address<T: Transport, W: Write>(
    client: &CompaniesHouseClient<T>,
    out: &mut W,
    number: &str,
) -> Result<()> {
    let address = client.get_company_address(number).await?;
    print_json(out, &address)
}
