pub mod debounce;
pub mod detail_poller;
pub mod document_list;
