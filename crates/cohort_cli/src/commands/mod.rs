pub(crate) mod crawl;
pub(crate) mod meta;
pub(crate) mod migrate;
pub(crate) mod reset;
pub(crate) mod status;
