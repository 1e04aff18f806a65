//! Extraction pipeline.
//!
//! The [`SkinExtractor`] drives every discovered skin bin through four stages:
//!
//! 1. **Text conversion**: the bin is converted to its text dump by the [`SkinCodec`].
//! 2. **Patch**: skin self references in the dump are rewritten to `Skin0`
//!    by the [`TextPatcher`].
//! 3. **Binary conversion**: the dump is converted back to a bin.
//! 4. **Relocation**: the bin is moved to its [`Layout`] destination and the
//!    dump is removed.
//!
//! Two items never share a destination: the second one to claim a path fails
//! at relocation without being converted. When packaging is enabled, every
//! bundle that received a bin is zipped into a `.fantome` archive once the
//! champion is done.
//!
//! A failure in any stage only fails that item. Items of one champion run on a
//! [`WorkerPool`] when more than one worker is configured. Related folders that
//! were merged into a champion are deleted once all of their items have
//! finished, so a folder never disappears under an in-flight conversion.

use crate::codec::SkinCodec;
use crate::error::{Result, Warning};
use crate::layout::{Layout, LayoutScheme, DEFAULT_OUTPUT_DIR_NAME};
use crate::metadata::{MetadataSource, SkinMetadata};
use crate::package::{pack_bundle, PackageOptions};
use crate::patcher::{PatchOutcome, TextPatcher};
use crate::pool::{TaskHandle, WorkerPool};
use crate::resolver::{
    discover, plan_batch, AliasTable, DiscoveryStrategy, EntityPlan, Origin, SkinFileMatcher,
    WorkItem,
};
use camino::{Utf8Path, Utf8PathBuf};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fs;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Knobs for an extraction run.
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    pub strategy: DiscoveryStrategy,
    pub scheme: LayoutScheme,
    pub aliases: AliasTable,
    /// Number of worker threads. `1` processes items on the calling thread.
    pub workers: usize,
    /// Folder created inside each champion folder to hold the output.
    pub output_dir_name: String,
    /// Keep the intermediate text dumps next to the source bins.
    pub keep_text: bool,
    /// Delete merged related folders once their items are done.
    pub remove_aliases: bool,
    /// Where skin names are looked up for [`LayoutScheme::NameQualified`].
    pub metadata: Option<MetadataSource>,
    /// Pack every finished bundle into a `.fantome` archive.
    pub package: Option<PackageOptions>,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            strategy: DiscoveryStrategy::default(),
            scheme: LayoutScheme::default(),
            aliases: AliasTable::with_defaults(),
            workers: 1,
            output_dir_name: DEFAULT_OUTPUT_DIR_NAME.to_string(),
            keep_text: false,
            remove_aliases: true,
            metadata: None,
            package: None,
        }
    }
}

/// Processing stage of a single item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Stage {
    TextConversion,
    Patch,
    BinaryConversion,
    Relocation,
    /// The worker running the item panicked; the stage it reached is unknown.
    Worker,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::TextConversion => "text conversion",
            Stage::Patch => "patch",
            Stage::BinaryConversion => "binary conversion",
            Stage::Relocation => "relocation",
            Stage::Worker => "worker",
        };
        f.write_str(name)
    }
}

/// Terminal state of an item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    Completed { destination: Utf8PathBuf },
    Failed { stage: Stage, cause: String },
}

impl ItemOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, ItemOutcome::Completed { .. })
    }
}

#[derive(Debug, Clone)]
pub struct ItemReport {
    pub item: WorkItem,
    pub outcome: ItemOutcome,
    pub warnings: Vec<Warning>,
}

/// Everything that happened to one champion folder.
#[derive(Debug, Clone)]
pub struct EntityReport {
    pub entity: String,
    pub output_root: Utf8PathBuf,
    /// Items in processing order: primary items first, then each related folder.
    pub items: Vec<ItemReport>,
    /// Candidate files rejected because of their name.
    pub invalid_count: usize,
    /// Discovery, metadata and cleanup warnings. Item warnings live on the items.
    pub warnings: Vec<Warning>,
    /// Related folders that were deleted after their items finished.
    pub removed_aliases: Vec<Utf8PathBuf>,
    /// `.fantome` archives written for this champion.
    pub packages: Vec<Utf8PathBuf>,
}

impl EntityReport {
    pub fn valid_count(&self) -> usize {
        self.items.len()
    }

    pub fn completed_count(&self) -> usize {
        self.items.iter().filter(|r| r.outcome.is_completed()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.items.len() - self.completed_count()
    }

    /// Item reports grouped by logical index.
    pub fn variant_groups(&self) -> BTreeMap<u32, Vec<&ItemReport>> {
        let mut groups: BTreeMap<u32, Vec<&ItemReport>> = BTreeMap::new();
        for report in &self.items {
            groups
                .entry(report.item.logical_index)
                .or_default()
                .push(report);
        }
        groups
    }

    /// Entity and item warnings together.
    pub fn all_warnings(&self) -> impl Iterator<Item = &Warning> {
        self.warnings
            .iter()
            .chain(self.items.iter().flat_map(|r| r.warnings.iter()))
    }
}

/// Summary of a whole run.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub entities: Vec<EntityReport>,
    /// Wall-clock time for the entire run.
    pub elapsed: Duration,
}

impl BatchReport {
    pub fn completed_count(&self) -> usize {
        self.entities.iter().map(EntityReport::completed_count).sum()
    }

    pub fn failed_count(&self) -> usize {
        self.entities.iter().map(EntityReport::failed_count).sum()
    }

    pub fn warning_count(&self) -> usize {
        self.entities.iter().map(|e| e.all_warnings().count()).sum()
    }
}

/// Progress information emitted during extraction.
///
/// `current`/`total` count finished items of the current entity during
/// [`Processing`](ExtractStage::Processing), and entities otherwise.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractProgress {
    pub stage: ExtractStage,
    pub entity: Option<String>,
    pub current: u32,
    pub total: u32,
}

/// Emitted in order: `Discovering` -> `Processing` (repeated) -> `CleaningUp` ->
/// `Packaging` -> `Complete`. `CleaningUp` and `Packaging` are skipped when
/// there is nothing to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ExtractStage {
    Discovering,
    Processing,
    CleaningUp,
    Packaging,
    Complete,
}

type ProgressCallback = Arc<dyn Fn(ExtractProgress) + Send + Sync>;
type StageResult<T> = std::result::Result<T, (Stage, String)>;

/// Per-item state shared with worker threads.
#[derive(Clone)]
struct ItemContext {
    codec: Arc<dyn SkinCodec>,
    patcher: Arc<TextPatcher>,
    keep_text: bool,
}

impl ItemContext {
    fn process(&self, item: WorkItem, destination: Utf8PathBuf) -> ItemReport {
        let mut warnings = Vec::new();
        let mut text_path = None;

        let outcome = match self.run_stages(&item, &destination, &mut text_path, &mut warnings) {
            Ok(()) => {
                tracing::debug!("{} -> {}", item.source_path, destination);
                ItemOutcome::Completed { destination }
            }
            Err((stage, cause)) => {
                tracing::error!(
                    "Failed to process {} during {}: {}",
                    item.source_path,
                    stage,
                    cause
                );
                if !self.keep_text {
                    if let Some(text) = text_path {
                        remove_text(&text, &mut warnings);
                    }
                }
                ItemOutcome::Failed { stage, cause }
            }
        };

        ItemReport {
            item,
            outcome,
            warnings,
        }
    }

    fn run_stages(
        &self,
        item: &WorkItem,
        destination: &Utf8Path,
        text_path: &mut Option<Utf8PathBuf>,
        warnings: &mut Vec<Warning>,
    ) -> StageResult<()> {
        let text = self
            .codec
            .to_text(&item.source_path)
            .map_err(|e| (Stage::TextConversion, e.to_string()))?;
        *text_path = Some(text.clone());

        match self.patcher.patch_file(text.as_std_path()) {
            Ok(PatchOutcome::MarkersNotFound) => {
                tracing::warn!("Outdated hashes, skin pattern not found in {}", text);
                warnings.push(Warning::PatchNotApplicable {
                    path: item.source_path.clone(),
                });
            }
            Ok(outcome) => tracing::debug!("Patched {}: {:?}", text, outcome),
            Err(e) => return Err((Stage::Patch, e.to_string())),
        }

        let binary = self
            .codec
            .to_binary(&text)
            .map_err(|e| (Stage::BinaryConversion, e.to_string()))?;

        relocate(&binary, destination).map_err(|e| (Stage::Relocation, e.to_string()))?;

        if !self.keep_text {
            remove_text(&text, warnings);
        }
        Ok(())
    }
}

/// Move `binary` to `destination`, replacing a file left there by an earlier run.
fn relocate(binary: &Utf8Path, destination: &Utf8Path) -> std::io::Result<()> {
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent)?;
    }
    if destination.as_std_path().is_file() {
        fs::remove_file(destination)?;
    }
    fs::rename(binary, destination)
}

fn remove_text(text: &Utf8Path, warnings: &mut Vec<Warning>) {
    if !text.as_std_path().exists() {
        return;
    }
    if let Err(e) = fs::remove_file(text) {
        tracing::warn!("Failed to remove {}: {}", text, e);
        warnings.push(Warning::TextCleanupFailed {
            path: text.to_path_buf(),
            message: e.to_string(),
        });
    }
}

/// Fail `item` because another item already owns its destination.
fn reject_claimed(item: WorkItem, owner: &Utf8Path) -> ItemReport {
    tracing::error!(
        "Failed to process {} during {}: destination already claimed by {}",
        item.source_path,
        Stage::Relocation,
        owner
    );
    let cause = format!("destination already claimed by {}", owner);
    ItemReport {
        item,
        outcome: ItemOutcome::Failed {
            stage: Stage::Relocation,
            cause,
        },
        warnings: Vec::new(),
    }
}

/// An item that was either processed inline or handed to the pool.
enum PendingItem {
    Ready(ItemReport),
    Queued {
        item: WorkItem,
        handle: TaskHandle<ItemReport>,
    },
}

impl PendingItem {
    fn finish(self) -> ItemReport {
        match self {
            PendingItem::Ready(report) => report,
            PendingItem::Queued { item, handle } => match handle.join() {
                Ok(report) => report,
                Err(e) => {
                    tracing::error!("Worker failed on {}: {}", item.source_path, e);
                    ItemReport {
                        item,
                        outcome: ItemOutcome::Failed {
                            stage: Stage::Worker,
                            cause: e.to_string(),
                        },
                        warnings: Vec::new(),
                    }
                }
            },
        }
    }
}

/// Runs the extraction pipeline over a champions root.
///
/// ```no_run
/// use camino::Utf8Path;
/// use ltk_skin_extractor::{ExtractOptions, RitobinCodec, SkinExtractor};
/// use std::sync::Arc;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let codec = RitobinCodec::new("ritobin_cli.exe")?;
/// let extractor = SkinExtractor::new(Arc::new(codec), ExtractOptions::default());
/// let report = extractor.run(Utf8Path::new("process_champions"))?;
/// println!("{} completed, {} failed", report.completed_count(), report.failed_count());
/// # Ok(())
/// # }
/// ```
pub struct SkinExtractor {
    context: ItemContext,
    matcher: SkinFileMatcher,
    options: ExtractOptions,
    progress_callback: Option<ProgressCallback>,
}

impl SkinExtractor {
    pub fn new(codec: Arc<dyn SkinCodec>, options: ExtractOptions) -> Self {
        Self {
            context: ItemContext {
                codec,
                patcher: Arc::new(TextPatcher::new()),
                keep_text: options.keep_text,
            },
            matcher: SkinFileMatcher::new(),
            options,
            progress_callback: None,
        }
    }

    /// Register a progress callback.
    ///
    /// The callback is invoked on the thread that called [`run`](Self::run).
    pub fn with_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ExtractProgress) + Send + Sync + 'static,
    {
        self.progress_callback = Some(Arc::new(callback));
        self
    }

    pub fn options(&self) -> &ExtractOptions {
        &self.options
    }

    /// Extract every champion folder under `root`.
    ///
    /// Fails only if `root` is missing or unreadable; per-item problems are
    /// reported in the returned [`BatchReport`].
    pub fn run(&self, root: &Utf8Path) -> Result<BatchReport> {
        let start_time = Instant::now();
        tracing::info!("Extracting skins from {}", root);

        self.emit_progress(ExtractProgress {
            stage: ExtractStage::Discovering,
            entity: None,
            current: 0,
            total: 0,
        });

        let plans = plan_batch(root, &self.options.aliases)?;
        tracing::info!("Found {} champion folders", plans.len());

        let pool = self.create_pool();
        let entities: Vec<EntityReport> = plans
            .iter()
            .map(|plan| self.process_entity_in(plan, pool.as_ref()))
            .collect();
        if let Some(pool) = pool {
            pool.shutdown();
        }

        let total = entities.len() as u32;
        self.emit_progress(ExtractProgress {
            stage: ExtractStage::Complete,
            entity: None,
            current: total,
            total,
        });

        Ok(BatchReport {
            entities,
            elapsed: start_time.elapsed(),
        })
    }

    /// Extract a single champion folder and its related folders.
    pub fn process_entity(&self, plan: &EntityPlan) -> EntityReport {
        let pool = self.create_pool();
        self.process_entity_in(plan, pool.as_ref())
    }

    fn create_pool(&self) -> Option<WorkerPool> {
        (self.options.workers > 1).then(|| WorkerPool::new(self.options.workers))
    }

    fn process_entity_in(&self, plan: &EntityPlan, pool: Option<&WorkerPool>) -> EntityReport {
        self.emit_progress(ExtractProgress {
            stage: ExtractStage::Discovering,
            entity: Some(plan.name.clone()),
            current: 0,
            total: 0,
        });

        let strategy = self.options.strategy;
        let primary = discover(&self.matcher, &plan.dir, &plan.name, Origin::Primary, strategy);
        let related: Vec<_> = plan
            .aliases
            .iter()
            .map(|dir| {
                let discovery = discover(&self.matcher, dir, &plan.name, Origin::Alias, strategy);
                (dir.clone(), discovery)
            })
            .collect();

        let invalid_count =
            primary.invalid_count() + related.iter().map(|(_, d)| d.invalid_count()).sum::<usize>();
        let mut warnings = primary.warnings;
        let mut scopes: Vec<(Option<Utf8PathBuf>, Vec<WorkItem>)> = vec![(None, primary.items)];
        for (dir, discovery) in related {
            warnings.extend(discovery.warnings);
            scopes.push((Some(dir), discovery.items));
        }
        let total: usize = scopes.iter().map(|(_, items)| items.len()).sum();

        tracing::info!(
            "{}: {} valid skin files, {} invalid, {} related folders",
            plan.name,
            total,
            invalid_count,
            plan.aliases.len()
        );

        let metadata = self.load_metadata(&plan.name, &mut warnings);
        let layout = Layout::new(
            plan.dir.join(&self.options.output_dir_name),
            self.options.scheme,
        );

        // Dispatch everything up front; results are collected per scope below.
        let mut claimed: HashMap<Utf8PathBuf, Utf8PathBuf> = HashMap::new();
        let pending: Vec<(Option<Utf8PathBuf>, Vec<(PendingItem, Utf8PathBuf, String)>)> = scopes
            .into_iter()
            .map(|(dir, items)| {
                let items = items
                    .into_iter()
                    .map(|item| {
                        let name = metadata
                            .as_ref()
                            .and_then(|m| m.name_for(item.logical_index));
                        let bundle = layout.bundle_dir_for(&item, name);
                        let label = name
                            .map(str::to_string)
                            .unwrap_or_else(|| format!("{} {}", plan.name, item.logical_index));
                        let destination = layout.destination_for(&item, name);

                        let pending = match claimed.get(&destination) {
                            Some(owner) => PendingItem::Ready(reject_claimed(item, owner)),
                            None => {
                                claimed.insert(destination.clone(), item.source_path.clone());
                                self.dispatch(item, destination, pool)
                            }
                        };
                        (pending, bundle, label)
                    })
                    .collect();
                (dir, items)
            })
            .collect();

        let mut items = Vec::with_capacity(total);
        let mut bundles: BTreeMap<Utf8PathBuf, String> = BTreeMap::new();
        let mut removed_aliases = Vec::new();
        for (dir, scope_items) in pending {
            for (pending_item, bundle, label) in scope_items {
                let report = pending_item.finish();
                if report.outcome.is_completed() {
                    bundles.entry(bundle).or_insert(label);
                }
                items.push(report);
                self.emit_progress(ExtractProgress {
                    stage: ExtractStage::Processing,
                    entity: Some(plan.name.clone()),
                    current: items.len() as u32,
                    total: total as u32,
                });
            }

            // Every item of this folder is terminal now.
            let Some(dir) = dir else { continue };
            if !self.options.remove_aliases {
                continue;
            }
            self.emit_progress(ExtractProgress {
                stage: ExtractStage::CleaningUp,
                entity: Some(plan.name.clone()),
                current: items.len() as u32,
                total: total as u32,
            });
            match fs::remove_dir_all(&dir) {
                Ok(()) => {
                    tracing::info!("Deleted folder: {}", dir);
                    removed_aliases.push(dir);
                }
                Err(e) => {
                    tracing::warn!("Failed to delete folder {}: {}", dir, e);
                    warnings.push(Warning::AliasCleanupFailed {
                        dir,
                        message: e.to_string(),
                    });
                }
            }
        }

        let packages = match &self.options.package {
            Some(package) => self.package_bundles(&plan.name, package, bundles, &mut warnings),
            None => Vec::new(),
        };

        let report = EntityReport {
            entity: plan.name.clone(),
            output_root: layout.output_root().to_path_buf(),
            items,
            invalid_count,
            warnings,
            removed_aliases,
            packages,
        };
        tracing::info!(
            "{}: {} completed, {} failed",
            report.entity,
            report.completed_count(),
            report.failed_count()
        );
        report
    }

    fn package_bundles(
        &self,
        entity: &str,
        package: &PackageOptions,
        bundles: BTreeMap<Utf8PathBuf, String>,
        warnings: &mut Vec<Warning>,
    ) -> Vec<Utf8PathBuf> {
        let total = bundles.len() as u32;
        let mut archives = Vec::with_capacity(bundles.len());
        for (current, (bundle, name)) in bundles.into_iter().enumerate() {
            self.emit_progress(ExtractProgress {
                stage: ExtractStage::Packaging,
                entity: Some(entity.to_string()),
                current: current as u32,
                total,
            });
            match pack_bundle(&bundle, &package.info_for(name)) {
                Ok(archive) => {
                    tracing::info!("Created package: {}", archive);
                    archives.push(archive);
                }
                Err(e) => {
                    tracing::warn!("Failed to package {}: {}", bundle, e);
                    warnings.push(Warning::PackagingFailed {
                        bundle,
                        message: e.to_string(),
                    });
                }
            }
        }
        archives
    }

    fn dispatch(
        &self,
        item: WorkItem,
        destination: Utf8PathBuf,
        pool: Option<&WorkerPool>,
    ) -> PendingItem {
        let Some(pool) = pool else {
            return PendingItem::Ready(self.context.process(item, destination));
        };

        let context = self.context.clone();
        let job_item = item.clone();
        let job_destination = destination.clone();
        match pool.submit(move || context.process(job_item, job_destination)) {
            Ok(handle) => PendingItem::Queued { item, handle },
            Err(e) => {
                tracing::debug!("{}; processing {} inline", e, item.source_path);
                PendingItem::Ready(self.context.process(item, destination))
            }
        }
    }

    fn load_metadata(&self, entity: &str, warnings: &mut Vec<Warning>) -> Option<SkinMetadata> {
        if self.options.scheme != LayoutScheme::NameQualified {
            return None;
        }
        let source = self.options.metadata.as_ref()?;

        let message = match source.load(entity) {
            Ok(Some(metadata)) => {
                tracing::debug!("Loaded {} skin names for {}", metadata.len(), entity);
                return Some(metadata);
            }
            Ok(None) => format!("no metadata document in {}", source.dir()),
            Err(e) => e.to_string(),
        };

        tracing::warn!("No skin names for {}: {}", entity, message);
        warnings.push(Warning::MetadataUnavailable {
            entity: entity.to_string(),
            message,
        });
        None
    }

    /// Emit a progress event if a callback was registered.
    fn emit_progress(&self, progress: ExtractProgress) {
        if let Some(callback) = &self.progress_callback {
            callback(progress);
        }
    }
}
