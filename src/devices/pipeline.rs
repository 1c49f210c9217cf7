use crate::devices::normalize::NormalizedDevice;
use icu_collator::options::{CollatorOptions, Strength};
use icu_collator::{Collator, CollatorBorrowed};
use std::cmp::Ordering;
use std::collections::HashMap;

thread_local! {
    // Secondary strength: accents matter, case does not.
    static NAME_COLLATOR: Option<CollatorBorrowed<'static>> = {
        let mut options = CollatorOptions::default();
        options.strength = Some(Strength::Secondary);
        Collator::try_new(Default::default(), options).ok()
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Online,
    Offline,
}

impl StatusFilter {
    pub fn matches(self, device: &NormalizedDevice) -> bool {
        match self {
            Self::All => true,
            Self::Online => device.online,
            Self::Offline => !device.online,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::All => "All",
            Self::Online => "Online",
            Self::Offline => "Offline",
        }
    }
}

/// Everything the filter bar controls.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceQuery {
    pub status: StatusFilter,
    pub folder: Option<String>,
    pub search: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub total: usize,
    pub online: usize,
    pub offline: usize,
}

impl StatusCounts {
    pub fn tally<'a>(devices: impl IntoIterator<Item = &'a NormalizedDevice>) -> Self {
        devices.into_iter().fold(Self::default(), |mut acc, d| {
            acc.total += 1;
            if d.online {
                acc.online += 1;
            } else {
                acc.offline += 1;
            }
            acc
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FolderGroup<'a> {
    /// `None` is the bucket for devices without a folder.
    pub folder: Option<String>,
    pub devices: Vec<&'a NormalizedDevice>,
    pub counts: StatusCounts,
}

/// Alphabetical ordering that ignores case and places accented letters next
/// to their base letter ("Émile" sorts between "alpha" and "Zeta"). Ties fall
/// back to the exact text so the result does not depend on input order.
pub fn compare_names(a: &str, b: &str) -> Ordering {
    NAME_COLLATOR
        .with(|collator| match collator {
            Some(collator) => collator.compare(a, b),
            None => a.to_lowercase().cmp(&b.to_lowercase()),
        })
        .then_with(|| a.cmp(b))
}

/// True when any searchable field contains `needle`, which must already be lowercase.
pub fn matches_search(device: &NormalizedDevice, needle: &str) -> bool {
    let fields = [
        Some(device.name.as_str()),
        device.os.as_deref(),
        device.ip_address.as_deref(),
        device.current_logged_users.as_deref(),
        device.last_login_user.as_deref(),
        device.folder.as_deref(),
    ];

    fields
        .into_iter()
        .flatten()
        .any(|field| field.to_lowercase().contains(needle))
}

/// Status filter, then folder, then search, then a stable sort by name.
/// Pure: safe to run on every keystroke and every poll.
pub fn apply<'a>(devices: &'a [NormalizedDevice], query: &DeviceQuery) -> Vec<&'a NormalizedDevice> {
    let needle = query.search.to_lowercase();

    let mut result: Vec<&NormalizedDevice> = devices
        .iter()
        .filter(|d| query.status.matches(d))
        .filter(|d| match &query.folder {
            Some(folder) => d.folder.as_deref() == Some(folder.as_str()),
            None => true,
        })
        .filter(|d| needle.is_empty() || matches_search(d, &needle))
        .collect();

    result.sort_by(|a, b| compare_names(&a.name, &b.name));
    result
}

/// Distinct folders for the folder selector, sorted case-insensitively.
pub fn folders(devices: &[NormalizedDevice]) -> Vec<String> {
    let mut names: Vec<String> = devices
        .iter()
        .filter_map(|d| d.folder.as_deref())
        .filter(|f| *f != "Unknown")
        .map(str::to_string)
        .collect();

    names.sort_by(|a, b| compare_names(a, b));
    names.dedup();
    names
}

/// Groups already-filtered devices by folder, keeping their order inside each
/// group. Named folders come first, sorted; the no-folder bucket is last.
pub fn group_by_folder<'a>(devices: &[&'a NormalizedDevice]) -> Vec<FolderGroup<'a>> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut named: Vec<(&str, Vec<&'a NormalizedDevice>)> = Vec::new();
    let mut ungrouped = Vec::new();

    for &device in devices {
        match device.folder.as_deref() {
            Some(folder) => {
                let slot = *index.entry(folder).or_insert_with(|| {
                    named.push((folder, Vec::new()));
                    named.len() - 1
                });
                named[slot].1.push(device);
            }
            None => ungrouped.push(device),
        }
    }

    named.sort_by(|a, b| compare_names(a.0, b.0));

    let mut groups: Vec<FolderGroup<'a>> = named
        .into_iter()
        .map(|(folder, members)| FolderGroup {
            folder: Some(folder.to_string()),
            counts: StatusCounts::tally(members.iter().copied()),
            devices: members,
        })
        .collect();

    if !ungrouped.is_empty() {
        groups.push(FolderGroup {
            folder: None,
            counts: StatusCounts::tally(ungrouped.iter().copied()),
            devices: ungrouped,
        });
    }

    groups
}
