//! Interactive list session: one command per input line, filters applied after a quiet period.

use crate::error::{ApiError, BrowseError, LIST_LOAD_ERROR};
use crate::models::{DocumentFilters, FilterField, PageSize, SortKey};
use crate::render::render_list;
use crate::services::debounce::Debouncer;
use crate::services::document_list::{DocumentListController, DocumentLister};
use std::io::Write;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

pub const HELP: &str = "\
Commands:
  <field>=<value>   set a filter (cnpj, supplier, from, to, min, max, invoice); empty value clears it
  clear [field]     clear one filter, or all of them
  sort <key>        date_desc, date_asc, amount_desc, amount_asc, supplier_asc, supplier_desc
  size <n>          page size: 10, 20 or 50
  page <n>          go to page n
  next | prev       move one page
  refresh           fetch the list again
  quit              leave";

#[derive(Debug, Clone, PartialEq)]
pub enum BrowseCommand {
    SetFilter(FilterField, String),
    Clear(Option<FilterField>),
    Sort(SortKey),
    PageSize(PageSize),
    Page(usize),
    Next,
    Previous,
    Refresh,
    Help,
    Quit,
}

impl BrowseCommand {
    /// `Ok(None)` for a blank line.
    pub fn parse(line: &str) -> Result<Option<Self>, String> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        if let Some((field, value)) = line.split_once('=') {
            let field: FilterField = field.parse()?;
            return Ok(Some(BrowseCommand::SetFilter(field, value.trim().to_string())));
        }

        let mut words = line.split_whitespace();
        let verb = words.next().unwrap_or_default().to_lowercase();
        let arg = words.next();
        let command = match (verb.as_str(), arg) {
            ("clear", None) => BrowseCommand::Clear(None),
            ("clear", Some(field)) => BrowseCommand::Clear(Some(field.parse()?)),
            ("sort", Some(key)) => BrowseCommand::Sort(key.parse()?),
            ("size", Some(n)) => BrowseCommand::PageSize(n.parse()?),
            ("page", Some(n)) => BrowseCommand::Page(
                n.parse()
                    .map_err(|_| format!("Invalid page number '{}'", n))?,
            ),
            ("next" | "n", None) => BrowseCommand::Next,
            ("prev" | "p", None) => BrowseCommand::Previous,
            ("refresh" | "r", None) => BrowseCommand::Refresh,
            ("help" | "?", None) => BrowseCommand::Help,
            ("quit" | "q" | "exit", None) => BrowseCommand::Quit,
            ("sort" | "size" | "page", None) => {
                return Err(format!("'{}' needs an argument", verb));
            }
            _ => return Err(format!("Unknown command '{}' (type 'help')", line)),
        };
        Ok(Some(command))
    }
}

/// Replace the controller's records with a fresh fetch for its applied filters.
/// A failed fetch keeps the previous records and is reported inline; only a lost
/// session ends the session.
async fn reload<L, W>(
    lister: &L,
    controller: &mut DocumentListController,
    out: &mut W,
) -> Result<(), BrowseError>
where
    L: DocumentLister,
    W: Write,
{
    match lister.list_documents(controller.filters()).await {
        Ok(documents) => {
            controller.set_documents(documents);
            Ok(())
        }
        Err(ApiError::Unauthenticated) => Err(ApiError::Unauthenticated.into()),
        Err(e) => {
            tracing::warn!(error = %e, "document list fetch failed");
            writeln!(out, "{}", e.user_message(LIST_LOAD_ERROR))?;
            Ok(())
        }
    }
}

fn show<W: Write>(controller: &DocumentListController, out: &mut W) -> Result<(), BrowseError> {
    writeln!(out, "{}", render_list(&controller.view(), controller.filters()))?;
    out.flush()?;
    Ok(())
}

/// Drive a browse session until `quit` or end of input. Filter edits are
/// debounced; sorting and paging apply at once. A filter edit still waiting at end
/// of input is applied before returning, one still waiting at `quit` is dropped.
pub async fn run_browse<L, R, W>(
    lister: &L,
    input: R,
    out: &mut W,
    debounce: Duration,
) -> Result<(), BrowseError>
where
    L: DocumentLister,
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut controller = DocumentListController::new();
    let mut draft = DocumentFilters::default();
    let mut debouncer: Debouncer<DocumentFilters> = Debouncer::new(debounce);
    let mut lines = input.lines();

    reload(lister, &mut controller, out).await?;
    show(&controller, out)?;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    if let Some(filters) = debouncer.cancel() {
                        if controller.apply_filters(filters) {
                            reload(lister, &mut controller, out).await?;
                            show(&controller, out)?;
                        }
                    }
                    break;
                };
                let command = match BrowseCommand::parse(&line) {
                    Ok(Some(command)) => command,
                    Ok(None) => continue,
                    Err(message) => {
                        writeln!(out, "{}", message)?;
                        continue;
                    }
                };
                tracing::debug!(?command, "browse command");
                match command {
                    BrowseCommand::SetFilter(field, value) => {
                        draft.set(field, value);
                        debouncer.push(draft.clone());
                    }
                    BrowseCommand::Clear(Some(field)) => {
                        draft.set(field, "");
                        debouncer.push(draft.clone());
                    }
                    BrowseCommand::Clear(None) => {
                        draft = DocumentFilters::default();
                        debouncer.push(draft.clone());
                    }
                    BrowseCommand::Sort(key) => {
                        controller.set_sort(key);
                        show(&controller, out)?;
                    }
                    BrowseCommand::PageSize(size) => {
                        controller.set_page_size(size);
                        show(&controller, out)?;
                    }
                    BrowseCommand::Page(n) => {
                        controller.set_page(n);
                        show(&controller, out)?;
                    }
                    BrowseCommand::Next => {
                        controller.next_page();
                        show(&controller, out)?;
                    }
                    BrowseCommand::Previous => {
                        controller.previous_page();
                        show(&controller, out)?;
                    }
                    BrowseCommand::Refresh => {
                        reload(lister, &mut controller, out).await?;
                        show(&controller, out)?;
                    }
                    BrowseCommand::Help => writeln!(out, "{}", HELP)?,
                    BrowseCommand::Quit => {
                        debouncer.cancel();
                        break;
                    }
                }
            }
            filters = debouncer.settled() => {
                if controller.apply_filters(filters) {
                    reload(lister, &mut controller, out).await?;
                    show(&controller, out)?;
                }
            }
        }
    }
    Ok(())
}
