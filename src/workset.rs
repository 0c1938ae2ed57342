//! Disc layout the compiler resolves jumps against: titlesets, their titles
//! and chapter counts, and the menus of each domain with their entries.
//!
//! Loaded from JSON by the command-line tool:
//!
//! ```json
//! {
//!   "vmgm": { "menus": [ { "entries": ["title"] } ] },
//!   "titlesets": [
//!     { "titles": [ { "chapters": 4 } ], "menus": [ { "entries": ["root"] } ] }
//!   ]
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::ast::MenuEntry;

/// Domain a command block executes in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    /// Video manager menus (and the first-play PGC).
    Vmgm,
    /// Menus of a titleset.
    Vtsm(u8),
    /// A title of a titleset; `title` is numbered within the titleset.
    Vts { titleset: u8, title: u8 },
}

impl Domain {
    pub fn titleset(self) -> Option<u8> {
        match self {
            Domain::Vmgm => None,
            Domain::Vtsm(ts) | Domain::Vts { titleset: ts, .. } => Some(ts),
        }
    }

    pub fn is_menu(self) -> bool {
        !matches!(self, Domain::Vts { .. })
    }
}

/// Program and cell counts of the PGC a block belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PgcShape {
    pub programs: u16,
    pub cells: u16,
}

/// Where a command block lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub domain: Domain,
    pub pgc: Option<PgcShape>,
}

impl Location {
    pub fn new(domain: Domain) -> Self {
        Location { domain, pgc: None }
    }

    pub fn with_pgc(mut self, programs: u16, cells: u16) -> Self {
        self.pgc = Some(PgcShape { programs, cells });
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuPgc {
    #[serde(default)]
    pub entries: Vec<MenuEntry>,
}

/// Menus of one domain, numbered from 1 in order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MenuGroup {
    pub pgcs: Vec<MenuPgc>,
}

impl MenuGroup {
    pub fn new(entries: &[&[MenuEntry]]) -> Self {
        MenuGroup {
            pgcs: entries.iter().map(|e| MenuPgc { entries: e.to_vec() }).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.pgcs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pgcs.is_empty()
    }

    /// 1-based number of the menu carrying `entry`.
    pub fn entry_pgc(&self, entry: MenuEntry) -> Option<u16> {
        let index = self.pgcs.iter().position(|p| p.entries.contains(&entry))?;
        u16::try_from(index + 1).ok()
    }

    /// First entry declared on menu `pgc` (1-based).
    pub fn pgc_entry(&self, pgc: u16) -> Option<MenuEntry> {
        let index = usize::from(pgc).checked_sub(1)?;
        self.pgcs.get(index)?.entries.first().copied()
    }

    pub fn has_pgc(&self, pgc: u16) -> bool {
        pgc >= 1 && usize::from(pgc) <= self.pgcs.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Title {
    pub chapters: u16,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Titleset {
    #[serde(default)]
    pub titles: Vec<Title>,
    #[serde(default)]
    pub menus: MenuGroup,
}

impl Titleset {
    /// A titleset whose titles have the given chapter counts.
    pub fn with_titles(chapters: &[u16]) -> Self {
        Titleset {
            titles: chapters.iter().map(|&chapters| Title { chapters }).collect(),
            menus: MenuGroup::default(),
        }
    }

    pub fn with_menus(mut self, menus: MenuGroup) -> Self {
        self.menus = menus;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vmgm {
    #[serde(default)]
    pub menus: MenuGroup,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workset {
    #[serde(default)]
    pub vmgm: Vmgm,
    #[serde(default)]
    pub titlesets: Vec<Titleset>,
}

impl Workset {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn titleset(&self, n: u8) -> Option<&Titleset> {
        self.titlesets.get(usize::from(n).checked_sub(1)?)
    }

    /// Menus of titleset `n`, or of the VMGM for `None`.
    pub fn menus(&self, titleset: Option<u8>) -> Option<&MenuGroup> {
        match titleset {
            None => Some(&self.vmgm.menus),
            Some(n) => self.titleset(n).map(|ts| &ts.menus),
        }
    }

    pub fn title_count(&self) -> usize {
        self.titlesets.iter().map(|ts| ts.titles.len()).sum()
    }

    /// Disc-wide number of local title `title` in titleset `titleset`.
    pub fn global_title(&self, titleset: u8, title: u8) -> Option<u8> {
        let ts = self.titleset(titleset)?;
        if title == 0 || usize::from(title) > ts.titles.len() {
            return None;
        }
        let before: usize = self.titlesets[..usize::from(titleset) - 1].iter().map(|t| t.titles.len()).sum();
        u8::try_from(before + usize::from(title)).ok()
    }

    /// Titleset and local number of disc-wide title `global`.
    pub fn locate_title(&self, global: u8) -> Option<(u8, u8)> {
        let mut remaining = usize::from(global).checked_sub(1)?;
        for (i, ts) in self.titlesets.iter().enumerate() {
            if remaining < ts.titles.len() {
                return Some((u8::try_from(i + 1).ok()?, u8::try_from(remaining + 1).ok()?));
            }
            remaining -= ts.titles.len();
        }
        None
    }

    pub fn chapters(&self, titleset: u8, title: u8) -> Option<u16> {
        let ts = self.titleset(titleset)?;
        ts.titles.get(usize::from(title).checked_sub(1)?).map(|t| t.chapters)
    }
}
