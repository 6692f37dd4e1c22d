use std::collections::HashMap;

use crate::cache::parse_timestamp;
use crate::debrid::Download;

/// Downloads keyed by the hoster link they were generated from.
///
/// Built once per run and only read afterwards. When several downloads
/// share a link the newest `generated` wins; if either timestamp does not
/// parse the first one seen is kept.
#[derive(Debug, Default)]
pub struct DownloadIndex {
    by_link: HashMap<String, Download>,
}

impl DownloadIndex {
    pub fn new(downloads: &[Download]) -> Self {
        let mut by_link: HashMap<String, Download> = HashMap::new();

        for download in downloads {
            if download.link.is_empty() {
                continue;
            }
            match by_link.get(&download.link) {
                None => {
                    by_link.insert(download.link.clone(), download.clone());
                }
                Some(incumbent) => {
                    if is_newer(download, incumbent) {
                        by_link.insert(download.link.clone(), download.clone());
                    }
                }
            }
        }

        Self { by_link }
    }

    pub fn get(&self, link: &str) -> Option<&Download> {
        self.by_link.get(link)
    }

    pub fn len(&self) -> usize {
        self.by_link.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_link.is_empty()
    }
}

fn is_newer(candidate: &Download, incumbent: &Download) -> bool {
    let candidate = candidate.generated.as_deref().and_then(parse_timestamp);
    let incumbent = incumbent.generated.as_deref().and_then(parse_timestamp);
    match (candidate, incumbent) {
        (Some(candidate), Some(incumbent)) => candidate > incumbent,
        _ => false,
    }
}
