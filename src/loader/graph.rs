//! Extra file discovery.
//!
//! Starting from the files a variant names directly, [`Discovery`] follows the
//! `extraFiles` each fetched file reports and records the result as a
//! [`FileGraph`]: one [`FileNode`] per URL with its outgoing edges in
//! declaration order. Each level of the graph is fetched concurrently, and
//! every URL is fetched and expanded exactly once no matter how many files
//! reference it.
//!
//! Cycles and the depth limit are checked afterwards by one depth-first walk
//! over the recorded edges ([`FileGraph::check`]). A file reached through
//! different parents (a diamond) is shared rather than reported as a cycle.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use futures::future::try_join_all;

use super::Strictness;
use super::validation::validate_loaded_source;
use crate::cache::FetchCache;
use crate::core::CodevarError;
use crate::models::LoadedSource;
use crate::sources::Collaborators;
use crate::utils::url_paths::make_relative_key;

/// A fetched file and the URLs of the files it declares.
#[derive(Debug, Clone)]
pub struct FileNode {
    /// What the source loader returned
    pub loaded: Arc<LoadedSource>,
    /// Declared files, in declaration order
    pub children: Vec<String>,
}

/// Every file reachable from a variant's entry, keyed by URL.
#[derive(Debug, Clone, Default)]
pub struct FileGraph {
    nodes: HashMap<String, FileNode>,
}

/// Visit state of one URL during [`FileGraph::check`].
#[derive(Debug, Clone, Copy)]
enum Mark {
    /// On the current path
    Active,
    /// Fully explored; longest chain of hops below it
    Done(usize),
}

impl FileGraph {
    /// The node fetched for `url`.
    pub fn get(&self, url: &str) -> Option<&FileNode> {
        self.nodes.get(url)
    }

    /// Number of fetched files.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Reject cycles and paths longer than `max_depth` hops.
    ///
    /// `entry_url` sits at depth 0 with `roots` as its children. Along each
    /// path a revisited URL is reported before the depth limit, matching the
    /// order a recursive loader would hit them in. Runs in time linear in the
    /// number of edges.
    ///
    /// # Errors
    ///
    /// [`CodevarError::CircularDependency`] naming the first URL found on its
    /// own path, or [`CodevarError::MaxDepthExceeded`].
    pub fn check(&self, entry_url: &str, roots: &[String], max_depth: usize) -> Result<(), CodevarError> {
        let mut walk = Walk {
            graph: self,
            max_depth,
            marks: HashMap::new(),
        };
        walk.marks.insert(entry_url, Mark::Active);
        for root in roots {
            walk.visit(root, 1)?;
        }
        Ok(())
    }
}

struct Walk<'g> {
    graph: &'g FileGraph,
    max_depth: usize,
    marks: HashMap<&'g str, Mark>,
}

impl<'g> Walk<'g> {
    /// Visit `url` at `depth` and return the longest chain of hops below it.
    fn visit(&mut self, url: &'g str, depth: usize) -> Result<usize, CodevarError> {
        match self.marks.get(url) {
            Some(Mark::Active) => {
                return Err(CodevarError::CircularDependency { url: url.to_string() });
            }
            Some(Mark::Done(below)) => {
                return if depth + below > self.max_depth {
                    Err(CodevarError::MaxDepthExceeded)
                } else {
                    Ok(*below)
                };
            }
            None => {}
        }
        if depth > self.max_depth {
            return Err(CodevarError::MaxDepthExceeded);
        }

        let graph = self.graph;
        self.marks.insert(url, Mark::Active);
        let mut below = 0;
        if let Some(node) = graph.nodes.get(url) {
            for child in &node.children {
                below = below.max(1 + self.visit(child, depth + 1)?);
            }
        }
        self.marks.insert(url, Mark::Done(below));
        Ok(below)
    }
}

/// State shared by every fetch of one discovery run.
pub struct Discovery<'a> {
    pub collaborators: &'a Collaborators,
    pub cache: &'a FetchCache,
    pub max_depth: usize,
    pub strictness: Strictness,
    pub variant_name: &'a str,
    /// URL of the variant's main file; base for re-keyed file names
    pub entry_url: &'a str,
    /// Resolved URLs of the declared extra files, when the variant promises
    /// they are exhaustive
    pub listed: Option<&'a HashSet<String>>,
}

impl Discovery<'_> {
    /// Fetch `url` through the cache and validate what came back.
    pub async fn fetch(&self, url: &str) -> Result<Arc<LoadedSource>, CodevarError> {
        let loader =
            self.collaborators.source_loader.as_ref().ok_or(CodevarError::MissingSourceLoader)?;
        let loaded = self.cache.get(url, loader).await?;
        validate_loaded_source(url, &loaded)?;
        Ok(loaded)
    }

    /// Extra files `loaded` declares that discovery should follow, as
    /// `(key, url)` pairs in declaration order.
    ///
    /// When the variant lists its files, declared files are skipped since the
    /// variant already loads them, and anything else is either rejected or
    /// followed with a warning depending on strictness.
    pub fn follow(&self, loaded: &LoadedSource) -> Result<Vec<(String, String)>, CodevarError> {
        let Some(extra_files) = &loaded.extra_files else {
            return Ok(Vec::new());
        };
        let Some(listed) = self.listed else {
            return Ok(extra_files.iter().map(|(k, v)| (k.clone(), v.clone())).collect());
        };

        let unexpected: Vec<(String, String)> = extra_files
            .iter()
            .filter(|(_, url)| !listed.contains(*url))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        if unexpected.is_empty() {
            return Ok(unexpected);
        }

        let names = unexpected
            .iter()
            .map(|(_, url)| make_relative_key(self.entry_url, url).unwrap_or_else(|| url.clone()))
            .collect::<Vec<_>>()
            .join(", ");

        match self.strictness {
            Strictness::Strict => Err(CodevarError::UnexpectedFiles {
                variant: self.variant_name.to_string(),
                files: names,
            }),
            Strictness::Lenient => {
                tracing::warn!(
                    "Variant {} declares allFilesListed but loading discovered {names}; \
                     update its metadata to list them",
                    self.variant_name
                );
                Ok(unexpected)
            }
        }
    }

    /// Fetch every file reachable from `roots`, one level at a time.
    ///
    /// `roots` sit one hop below the entry. A level deeper than the depth
    /// limit fails before anything on it is fetched; cycles are left to
    /// [`FileGraph::check`], since the entry and every visited URL are never
    /// fetched twice.
    ///
    /// # Errors
    ///
    /// Loader failures, validation failures, `allFilesListed` violations and
    /// [`CodevarError::MaxDepthExceeded`].
    pub async fn discover(&self, roots: &[String]) -> Result<FileGraph, CodevarError> {
        let mut queued: HashSet<String> = HashSet::from([self.entry_url.to_string()]);
        let mut frontier: Vec<String> =
            roots.iter().filter(|url| queued.insert((*url).clone())).cloned().collect();
        let mut graph = FileGraph::default();
        let mut depth = 1;

        while !frontier.is_empty() {
            if depth > self.max_depth {
                return Err(CodevarError::MaxDepthExceeded);
            }
            tracing::debug!(
                target: "codevar::loader",
                "Resolving {} file(s) at depth {depth}",
                frontier.len()
            );

            let level = try_join_all(frontier.iter().map(|url| async move {
                let loaded = self.fetch(url).await?;
                let children: Vec<String> =
                    self.follow(&loaded)?.into_iter().map(|(_, child)| child).collect();
                Ok::<_, CodevarError>((url.clone(), FileNode { loaded, children }))
            }))
            .await?;

            let mut next = Vec::new();
            for (url, node) in level {
                next.extend(node.children.iter().filter(|child| queued.insert((*child).clone())).cloned());
                graph.nodes.insert(url, node);
            }
            frontier = next;
            depth += 1;
        }

        Ok(graph)
    }
}
