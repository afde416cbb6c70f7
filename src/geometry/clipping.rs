//! # Boolean Clipping
//!
//! Produces the intersection *shape* of two polygons by delegating to a
//! boolean polygon clipper working on integer coordinates.
//!
//! Clippers are stateful (clear, load paths, execute) and therefore never
//! shared: a [`ClipperPool`] owns a fixed set of worker threads, each holding
//! exactly one clipper, and every request is served by whichever worker picks
//! it up. The worker only touches its clipper through a [`ClipperLease`],
//! which resets the clipper when acquired and again when dropped.
//!
//! [`PolygonClipper`] is the adapter the fitness pipeline talks to. It scales
//! coordinates into integer clip space, bounds every request by a timeout and
//! reduces the clipper output to a single contour. Timeouts, multi-contour
//! results and worker failures degrade to a smaller (possibly empty) polygon
//! and are reported through the [`Recorder`]; they never fail the caller.

use std::fmt;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use i_overlay::core::fill_rule::FillRule;
use i_overlay::core::overlay_rule::OverlayRule;
use i_overlay::float::single::SingleFloatOverlay;
use tracing::{debug, trace, warn};

use super::{Point, Polygon};
use crate::error::{GeneticError, Result};
use crate::telemetry::{Counter, Recorder};

/// A point in integer clip space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IntPoint {
    pub x: i64,
    pub y: i64,
}

impl IntPoint {
    pub const fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }
}

/// Role of a path loaded into a [`Clipper`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathRole {
    Subject,
    Clip,
}

/// A stateful boolean polygon clipper.
///
/// Usage protocol: `clear`, then `add_path` for every closed input path, then
/// `intersect`. Implementations are confined to a single thread at a time.
pub trait Clipper: Send {
    /// Removes every loaded path.
    fn clear(&mut self);

    /// Loads one closed path.
    fn add_path(&mut self, path: Vec<IntPoint>, role: PathRole);

    /// Intersects all subject paths with all clip paths and returns the
    /// resulting contours. Disjoint pieces come back as separate contours.
    fn intersect(&mut self) -> Vec<Vec<IntPoint>>;
}

/// [`Clipper`] backed by the `i_overlay` Vatti-style overlay engine.
#[derive(Debug, Default)]
pub struct OverlayClipper {
    subject: Vec<Vec<[f64; 2]>>,
    clip: Vec<Vec<[f64; 2]>>,
}

impl OverlayClipper {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clipper for OverlayClipper {
    fn clear(&mut self) {
        self.subject.clear();
        self.clip.clear();
    }

    fn add_path(&mut self, path: Vec<IntPoint>, role: PathRole) {
        let contour: Vec<[f64; 2]> = path.iter().map(|p| [p.x as f64, p.y as f64]).collect();
        match role {
            PathRole::Subject => self.subject.push(contour),
            PathRole::Clip => self.clip.push(contour),
        }
    }

    fn intersect(&mut self) -> Vec<Vec<IntPoint>> {
        if self.subject.is_empty() || self.clip.is_empty() {
            return Vec::new();
        }

        let shapes: Vec<Vec<Vec<[f64; 2]>>> =
            self.subject
                .overlay(&self.clip, OverlayRule::Intersect, FillRule::NonZero);

        shapes
            .into_iter()
            .flatten()
            .filter(|contour| contour.len() >= 3)
            .map(|contour| {
                contour
                    .into_iter()
                    .map(|[x, y]| IntPoint::new(x.round() as i64, y.round() as i64))
                    .collect()
            })
            .collect()
    }
}

/// Exclusive, scoped access to a worker's clipper.
///
/// The clipper is cleared when the lease is taken and again when it is
/// dropped, so no paths leak from one request into the next.
pub struct ClipperLease<'a> {
    clipper: &'a mut dyn Clipper,
}

impl<'a> ClipperLease<'a> {
    pub fn acquire(clipper: &'a mut dyn Clipper) -> Self {
        clipper.clear();
        Self { clipper }
    }

    pub fn add_path(&mut self, path: Vec<IntPoint>, role: PathRole) {
        self.clipper.add_path(path, role);
    }

    pub fn intersect(&mut self) -> Vec<Vec<IntPoint>> {
        self.clipper.intersect()
    }
}

impl Drop for ClipperLease<'_> {
    fn drop(&mut self) {
        self.clipper.clear();
    }
}

/// Builds the clipper owned by one pool worker.
pub type ClipperFactory = dyn Fn() -> Box<dyn Clipper> + Send + Sync;

struct ClipJob {
    subject: Vec<IntPoint>,
    clip: Vec<IntPoint>,
    reply: Sender<Vec<Vec<IntPoint>>>,
}

/// A fixed set of worker threads, each confined to its own clipper.
pub struct ClipperPool {
    sender: Option<Sender<ClipJob>>,
    workers: Vec<JoinHandle<()>>,
}

impl ClipperPool {
    /// Spawns `size` workers. Each worker calls `factory` once for its clipper.
    pub fn new(size: usize, factory: Arc<ClipperFactory>) -> Result<Self> {
        if size == 0 {
            return Err(GeneticError::Configuration(
                "Clipper pool needs at least one worker".to_string(),
            ));
        }

        let (sender, receiver) = mpsc::channel::<ClipJob>();
        let receiver = Arc::new(Mutex::new(receiver));

        let mut workers = Vec::with_capacity(size);
        for id in 0..size {
            let receiver = Arc::clone(&receiver);
            let factory = Arc::clone(&factory);
            let handle = thread::Builder::new()
                .name(format!("clipper-{}", id))
                .spawn(move || {
                    let mut clipper = factory();
                    while let Some(job) = next_job(&receiver) {
                        let contours = {
                            let mut lease = ClipperLease::acquire(clipper.as_mut());
                            lease.add_path(job.clip, PathRole::Clip);
                            lease.add_path(job.subject, PathRole::Subject);
                            lease.intersect()
                        };
                        // The caller may have given up after its timeout.
                        let _ = job.reply.send(contours);
                    }
                    trace!(worker = id, "clipper worker stopped");
                })
                .map_err(|e| {
                    GeneticError::Geometry(format!("Failed to spawn clipper worker: {}", e))
                })?;
            workers.push(handle);
        }

        debug!(workers = size, "clipper pool started");
        Ok(Self {
            sender: Some(sender),
            workers,
        })
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Queues an intersection and returns the channel its contours arrive on.
    pub fn submit(
        &self,
        subject: Vec<IntPoint>,
        clip: Vec<IntPoint>,
    ) -> Result<Receiver<Vec<Vec<IntPoint>>>> {
        let sender = self
            .sender
            .as_ref()
            .ok_or_else(|| GeneticError::Geometry("Clipper pool is shut down".to_string()))?;

        let (reply, receiver) = mpsc::channel();
        sender
            .send(ClipJob {
                subject,
                clip,
                reply,
            })
            .map_err(|_| GeneticError::Geometry("Clipper workers are gone".to_string()))?;
        Ok(receiver)
    }
}

impl Drop for ClipperPool {
    fn drop(&mut self) {
        // Closing the channel ends every worker loop.
        self.sender.take();
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                warn!("clipper worker panicked");
            }
        }
    }
}

impl fmt::Debug for ClipperPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClipperPool")
            .field("workers", &self.workers.len())
            .finish()
    }
}

fn next_job(receiver: &Mutex<Receiver<ClipJob>>) -> Option<ClipJob> {
    let guard = receiver.lock().unwrap_or_else(PoisonError::into_inner);
    guard.recv().ok()
}

/// Tuning for [`PolygonClipper`].
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct ClippingOptions {
    /// Number of pool workers, and therefore of clipper instances.
    pub workers: usize,
    /// Upper bound for a single clip call.
    pub timeout: Duration,
    /// Factor applied to coordinates before they enter integer clip space.
    pub scale: f64,
}

impl ClippingOptions {
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(GeneticError::Configuration(
                "Clipping needs at least one worker".to_string(),
            ));
        }
        if self.timeout.is_zero() {
            return Err(GeneticError::Configuration(
                "Clipping timeout must be positive".to_string(),
            ));
        }
        if !(self.scale.is_finite() && self.scale > 0.0) {
            return Err(GeneticError::Configuration(format!(
                "Clipping scale must be positive, got {}",
                self.scale
            )));
        }
        Ok(())
    }
}

impl Default for ClippingOptions {
    fn default() -> Self {
        Self {
            workers: thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
            timeout: Duration::from_millis(500),
            scale: 1000.0,
        }
    }
}

/// Intersection-shape adapter over a [`ClipperPool`].
pub struct PolygonClipper {
    pool: ClipperPool,
    options: ClippingOptions,
    recorder: Arc<dyn Recorder>,
}

impl PolygonClipper {
    /// Adapter backed by [`OverlayClipper`] workers.
    pub fn new(options: ClippingOptions, recorder: Arc<dyn Recorder>) -> Result<Self> {
        Self::with_factory(
            options,
            recorder,
            Arc::new(|| -> Box<dyn Clipper> { Box::new(OverlayClipper::new()) }),
        )
    }

    /// Adapter backed by workers built from `factory`.
    pub fn with_factory(
        options: ClippingOptions,
        recorder: Arc<dyn Recorder>,
        factory: Arc<ClipperFactory>,
    ) -> Result<Self> {
        options.validate()?;
        let pool = ClipperPool::new(options.workers, factory)?;
        Ok(Self {
            pool,
            options,
            recorder,
        })
    }

    pub fn options(&self) -> &ClippingOptions {
        &self.options
    }

    /// Returns the part of `subject` inside `clip`.
    ///
    /// Empty inputs short-circuit to the empty polygon. When the clipper
    /// reports several disjoint pieces only the largest one is kept.
    pub fn intersection(&self, subject: &Polygon, clip: &Polygon) -> Polygon {
        if subject.is_empty() || clip.is_empty() {
            return Polygon::empty();
        }

        self.recorder.increment(Counter::Intersections, 1);

        let receiver = match self
            .pool
            .submit(self.to_clip_space(subject), self.to_clip_space(clip))
        {
            Ok(receiver) => receiver,
            Err(e) => {
                warn!(error = %e, "intersection could not be dispatched");
                self.recorder.increment(Counter::IntersectionErrors, 1);
                return Polygon::empty();
            }
        };

        match receiver.recv_timeout(self.options.timeout) {
            Ok(contours) => self.largest_contour(contours),
            Err(RecvTimeoutError::Timeout) => {
                warn!(
                    timeout_ms = self.options.timeout.as_millis() as u64,
                    "intersection timed out, substituting empty polygon"
                );
                self.recorder.increment(Counter::IntersectionTimeouts, 1);
                Polygon::empty()
            }
            Err(RecvTimeoutError::Disconnected) => {
                warn!("clipper worker dropped an intersection");
                self.recorder.increment(Counter::IntersectionErrors, 1);
                Polygon::empty()
            }
        }
    }

    fn largest_contour(&self, contours: Vec<Vec<IntPoint>>) -> Polygon {
        if contours.len() > 1 {
            debug!(
                contours = contours.len(),
                "intersection has several areas, keeping the largest"
            );
            self.recorder.increment(Counter::IntersectionMultipleAreas, 1);
        }

        let largest = contours
            .into_iter()
            .map(|contour| (contour_area(&contour), contour))
            .max_by(|(a, _), (b, _)| a.total_cmp(b));

        match largest {
            Some((_, contour)) => self.from_clip_space(&contour),
            None => {
                self.recorder.increment(Counter::IntersectionEmpty, 1);
                Polygon::empty()
            }
        }
    }

    fn to_clip_space(&self, polygon: &Polygon) -> Vec<IntPoint> {
        let scale = self.options.scale;
        polygon
            .points()
            .iter()
            .map(|p| IntPoint::new((p.x * scale) as i64, (p.y * scale) as i64))
            .collect()
    }

    fn from_clip_space(&self, contour: &[IntPoint]) -> Polygon {
        let scale = self.options.scale;
        Polygon::new(
            contour
                .iter()
                .map(|p| Point::new(p.x as f64 / scale, p.y as f64 / scale))
                .collect(),
        )
    }
}

impl fmt::Debug for PolygonClipper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PolygonClipper")
            .field("pool", &self.pool)
            .field("options", &self.options)
            .finish()
    }
}

/// Signed shoelace area of an integer contour.
fn contour_area(contour: &[IntPoint]) -> f64 {
    if contour.len() < 3 {
        return 0.0;
    }
    let mut twice: i128 = 0;
    for i in 0..contour.len() {
        let a = contour[i];
        let b = contour[(i + 1) % contour.len()];
        twice += a.x as i128 * b.y as i128 - b.x as i128 * a.y as i128;
    }
    twice as f64 * 0.5
}
