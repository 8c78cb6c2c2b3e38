//! Shot analysis job.
//!
//! A job owns everything one video needs: resolved backend profiles, the
//! backend handles, fusion, the ball locator, one phase tracker, the scorer
//! and an optional overlay renderer. Frames must be fed in order. Separate
//! videos run as separate jobs and share nothing.
//!
//! Per frame:
//!
//! ```text
//! detect (tier fallback) -> adapt -> ball search -> fuse -> track -> score -> overlay
//! ```

use hoopform_models::{
    AnalysisTier, AngleSet, Detection, JointName, QualityReport, ShotPhase, Side, Skeleton,
};
use image::RgbImage;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::detection::{backend_handles, detect_with_fallback, BackendHandles, Frame, PoseBackend, TierPlan};
use crate::error::{EngineError, EngineResult};
use crate::observability;
use crate::overlay::OverlayRenderer;
use crate::pose::{
    shooting_side, AngleComputer, BackendRegistry, BallLocator, PoseFusionEngine, WeightedSkeleton,
    BALL_SOURCE,
};
use crate::shot::{FormQualityScorer, PhaseStep, ShotPhaseTracker, TrackerEvent};

/// A finalized and graded shot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredShot {
    pub side: Option<Side>,
    pub report: QualityReport,
}

/// Everything produced for one frame.
#[derive(Debug, Clone, Serialize)]
pub struct FrameOutcome {
    pub frame_index: usize,
    /// Tier that served the frame; `None` when every backend set failed
    pub tier_used: Option<AnalysisTier>,
    pub skeleton: Skeleton,
    pub step: PhaseStep,
    pub shot: Option<ScoredShot>,
    #[serde(skip)]
    pub overlay: Option<Arc<RgbImage>>,
}

impl FrameOutcome {
    pub fn angles(&self) -> &AngleSet {
        &self.step.angles
    }

    pub fn is_skipped(&self) -> bool {
        self.tier_used.is_none()
    }
}

/// Result of a whole video.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AnalysisOutput {
    pub frames: Vec<FrameOutcome>,
    pub shots: Vec<ScoredShot>,
    pub abandoned_segments: usize,
}

/// Result of single-image mode.
#[derive(Debug, Clone, Serialize)]
pub struct ImageAnalysis {
    pub tier_used: Option<AnalysisTier>,
    pub skeleton: Skeleton,
    pub side: Option<Side>,
    /// Static angles only; vertical displacement is always undefined
    pub angles: AngleSet,
    #[serde(skip)]
    pub overlay: Option<RgbImage>,
}

/// Per-video analysis pipeline.
pub struct ShotAnalysisJob {
    config: EngineConfig,
    registry: BackendRegistry,
    handles: BackendHandles,
    plan: TierPlan,
    fusion: PoseFusionEngine,
    ball: BallLocator,
    tracker: ShotPhaseTracker,
    scorer: FormQualityScorer,
    overlay: Option<OverlayRenderer>,
    outcomes: Vec<FrameOutcome>,
    shots: Vec<ScoredShot>,
    abandoned: usize,
    last_frame: Option<usize>,
}

impl std::fmt::Debug for ShotAnalysisJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShotAnalysisJob")
            .field("tier", &self.plan.requested())
            .field("backends", &self.handles.keys().collect::<Vec<_>>())
            .field("phase", &self.tracker.phase())
            .field("frames", &self.outcomes.len())
            .finish()
    }
}

impl ShotAnalysisJob {
    /// Build a job. Configuration problems are fatal here and nowhere else.
    pub fn new(config: EngineConfig, backends: Vec<Arc<dyn PoseBackend>>) -> EngineResult<Self> {
        config.validate()?;
        let registry = BackendRegistry::from_config(&config.backends)?;
        let plan = TierPlan::for_tier(config.tier, &config)?;
        let handles = backend_handles(backends);

        for id in plan.backend_ids() {
            if !handles.contains_key(id) {
                warn!(backend = %id, "No handle for planned backend, it will be skipped");
            }
        }

        let overlay = if config.overlay.enabled {
            Some(OverlayRenderer::new(config.overlay.clone())?)
        } else {
            None
        };

        info!(
            tier = %config.tier,
            backends = handles.len(),
            overlay = overlay.is_some(),
            "Created shot analysis job"
        );

        Ok(Self {
            fusion: PoseFusionEngine::new(config.fusion.clone()),
            ball: BallLocator::new(config.ball.clone()),
            tracker: ShotPhaseTracker::new(config.tracker.clone()),
            scorer: FormQualityScorer::new(&config.scoring),
            config,
            registry,
            handles,
            plan,
            overlay,
            outcomes: Vec::new(),
            shots: Vec::new(),
            abandoned: 0,
            last_frame: None,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn plan(&self) -> &TierPlan {
        &self.plan
    }

    pub fn tracker(&self) -> &ShotPhaseTracker {
        &self.tracker
    }

    /// Detect, fuse, track and score one frame.
    pub async fn process_frame(&mut self, frame: &Frame) -> FrameOutcome {
        let served = detect_with_fallback(&self.plan, &self.handles, frame).await;
        let (tier_used, detections) = match served {
            Some(served) => (Some(served.tier_used), served.detections),
            None => (None, Vec::new()),
        };
        self.ingest(frame.index, tier_used, &detections, frame.image.as_deref())
    }

    /// Same as [`Self::process_frame`] for callers that already hold detections.
    pub fn process_detections(
        &mut self,
        frame_index: usize,
        detections: &[Detection],
        image: Option<&RgbImage>,
    ) -> FrameOutcome {
        let tier_used = if detections.is_empty() {
            None
        } else {
            Some(self.plan.requested())
        };
        self.ingest(frame_index, tier_used, detections, image)
    }

    /// Process a whole video in order and close it.
    pub async fn run(&mut self, frames: Vec<Frame>) -> AnalysisOutput {
        for frame in &frames {
            self.process_frame(frame).await;
        }
        self.finish()
    }

    /// Close the stream, abandoning any open segment, and drain results.
    pub fn finish(&mut self) -> AnalysisOutput {
        if let Some(last) = self.last_frame {
            if let Some(TrackerEvent::SegmentAbandoned { .. }) = self.tracker.finish(last) {
                self.abandoned += 1;
                observability::record_shot_abandoned();
            }
        }

        let output = AnalysisOutput {
            frames: std::mem::take(&mut self.outcomes),
            shots: std::mem::take(&mut self.shots),
            abandoned_segments: std::mem::take(&mut self.abandoned),
        };
        self.last_frame = None;

        info!(
            frames = output.frames.len(),
            shots = output.shots.len(),
            abandoned = output.abandoned_segments,
            "Finished shot analysis job"
        );
        output
    }

    /// Single-image mode: static angles and overlay, no phase tracking.
    pub async fn analyze_image(&self, frame: &Frame) -> ImageAnalysis {
        let served = detect_with_fallback(&self.plan, &self.handles, frame).await;
        let (tier_used, detections) = match served {
            Some(served) => (Some(served.tier_used), served.detections),
            None => (None, Vec::new()),
        };

        let image = frame.image.as_deref();
        let skeleton = self.fuse_frame(frame.index, &detections, image, None, false);
        let computer = match image {
            Some(img) => AngleComputer::for_frame(img.width(), img.height()),
            None => AngleComputer::new(),
        };
        let side = shooting_side(&skeleton);
        let angles = computer.compute(&skeleton);
        let overlay = match (&self.overlay, image) {
            (Some(renderer), Some(img)) => Some(renderer.render(img, &skeleton, &angles, side)),
            _ => None,
        };

        debug!(
            frame = frame.index,
            joints = skeleton.len(),
            angles = angles.defined_count(),
            "Analyzed still image"
        );

        ImageAnalysis {
            tier_used,
            skeleton,
            side,
            angles,
            overlay,
        }
    }

    fn ingest(
        &mut self,
        frame_index: usize,
        tier_used: Option<AnalysisTier>,
        detections: &[Detection],
        image: Option<&RgbImage>,
    ) -> FrameOutcome {
        // The ball leaves the hand around release; search the whole frame there.
        let wide = matches!(self.tracker.phase(), ShotPhase::Set | ShotPhase::Release);
        let skeleton = self.fuse_frame(frame_index, detections, image, self.tracker.side(), wide);
        if let Some(tier) = tier_used {
            observability::record_frame(tier.as_str(), skeleton.len());
        }

        if let Some((w, h)) = image
            .map(|img| img.dimensions())
            .or_else(|| detections.iter().find_map(|d| d.frame_size))
        {
            self.tracker.set_angle_computer(AngleComputer::for_frame(w, h));
        }

        let step = self.tracker.observe(frame_index, &skeleton);
        let shot = match &step.event {
            Some(TrackerEvent::SegmentFinalized(segment)) => {
                let report = self.scorer.score(segment);
                info!(
                    shot = segment.shot_index,
                    start = segment.start_frame,
                    end = segment.end_frame,
                    score = ?report.overall_score,
                    "Shot graded"
                );
                observability::record_shot_finalized();
                Some(ScoredShot {
                    side: step.side,
                    report,
                })
            }
            Some(TrackerEvent::SegmentAbandoned { .. }) => {
                self.abandoned += 1;
                observability::record_shot_abandoned();
                None
            }
            _ => None,
        };
        if let Some(shot) = &shot {
            self.shots.push(shot.clone());
        }

        let overlay = match (&self.overlay, image) {
            (Some(renderer), Some(img)) => Some(Arc::new(renderer.render(
                img,
                &skeleton,
                &step.angles,
                step.side,
            ))),
            _ => None,
        };

        self.last_frame = Some(frame_index);
        let outcome = FrameOutcome {
            frame_index,
            tier_used,
            skeleton,
            step,
            shot,
            overlay,
        };
        // Rendered frames go to the caller only; the job keeps the analysis.
        self.outcomes.push(FrameOutcome {
            overlay: None,
            ..outcome.clone()
        });
        outcome
    }

    /// Adapt every detection, add the located ball and fuse.
    ///
    /// The ball search is limited to the window around the shooting wrist
    /// unless `wide` is set or no wrist is known.
    fn fuse_frame(
        &self,
        frame_index: usize,
        detections: &[Detection],
        image: Option<&RgbImage>,
        side: Option<Side>,
        wide: bool,
    ) -> Skeleton {
        let mut inputs: Vec<WeightedSkeleton> = Vec::with_capacity(detections.len() + 1);
        for detection in detections {
            match self.registry.adapt(detection) {
                Ok(adapted) => inputs.push(adapted),
                Err(e) => {
                    warn!(frame = frame_index, backend = %detection.backend, error = %e, "Dropped detection");
                }
            }
        }

        let fused = self.fusion.fuse(&inputs);
        let Some(image) = image else {
            return fused;
        };
        if !self.config.ball.enabled {
            return fused;
        }

        let region = if wide {
            None
        } else {
            side.or_else(|| shooting_side(&fused))
                .and_then(|s| self.ball.search_region(&fused, s))
        };
        let Some(ball) = self.ball.locate(image, region) else {
            return fused;
        };

        let mut located = Skeleton::new();
        located.insert(JointName::BallPosition, ball);
        inputs.push(WeightedSkeleton::new(
            BALL_SOURCE,
            self.config.fusion.ball_reliability,
            located,
        ));
        self.fusion.fuse(&inputs)
    }
}

/// Run independent videos concurrently, one task per job.
///
/// Results come back in input order.
pub async fn run_jobs(jobs: Vec<(ShotAnalysisJob, Vec<Frame>)>) -> Vec<EngineResult<AnalysisOutput>> {
    let handles: Vec<_> = jobs
        .into_iter()
        .map(|(mut job, frames)| tokio::spawn(async move { job.run(frames).await }))
        .collect();

    let mut results = Vec::with_capacity(handles.len());
    for (index, handle) in handles.into_iter().enumerate() {
        results.push(handle.await.map_err(|e| {
            warn!(job = index, error = %e, "Analysis task failed");
            EngineError::TaskFailed(e.to_string())
        }));
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackendProfileConfig;
    use crate::detection::ReplayBackend;
    use crate::pose::{BuiltinSchema, SchemaEntry, SchemaSource};
    use crate::shot::fixtures::{detection, scripted_shot, skeleton, Arm, Ball, Pose};
    use hoopform_models::{AngleName, KeypointKey, QualityCategory, QualityLabel};
    use image::Rgb;
    use imageproc::drawing::draw_filled_circle_mut;

    fn fixture_config() -> EngineConfig {
        let mut config = EngineConfig::default();
        config.backends = vec![BackendProfileConfig {
            id: "fixture".to_string(),
            schema: SchemaSource::Builtin {
                name: BuiltinSchema::Blazepose33,
                extra: vec![SchemaEntry {
                    key: KeypointKey::from("ball_position"),
                    joint: JointName::BallPosition,
                }],
            },
            reliability: 0.9,
            min_confidence: 0.3,
        }];
        config.tiers.clear();
        config.tiers.insert(AnalysisTier::Free, vec!["fixture".to_string()]);
        config
    }

    fn scripted_backend() -> Arc<dyn PoseBackend> {
        Arc::new(ReplayBackend::from_detections(
            "fixture",
            scripted_shot()
                .iter()
                .enumerate()
                .map(|(i, pose)| detection("fixture", i, pose)),
        ))
    }

    fn frames(n: usize) -> Vec<Frame> {
        (0..n).map(Frame::new).collect()
    }

    #[tokio::test]
    async fn test_run_scripted_shot() {
        let mut job = ShotAnalysisJob::new(fixture_config(), vec![scripted_backend()]).unwrap();
        let output = job.run(frames(40)).await;

        assert_eq!(output.frames.len(), 40);
        assert_eq!(output.shots.len(), 1);
        assert_eq!(output.abandoned_segments, 0);

        let shot = &output.shots[0];
        assert_eq!(shot.side, Some(Side::Right));
        assert_eq!(shot.report.segment.start_frame, 8);
        assert!(shot.report.insufficient().is_empty());
        assert_eq!(
            shot.report.segment.phases_visited(),
            vec![
                ShotPhase::Load,
                ShotPhase::Set,
                ShotPhase::Release,
                ShotPhase::FollowThrough
            ]
        );
        assert!(output.frames.iter().all(|f| f.tier_used == Some(AnalysisTier::Free)));
        assert_eq!(output.frames.iter().filter(|f| f.shot.is_some()).count(), 1);
    }

    #[tokio::test]
    async fn test_missing_frames_are_skipped_not_fatal() {
        // Replay only has 40 frames; the rest fail every backend set.
        let mut job = ShotAnalysisJob::new(fixture_config(), vec![scripted_backend()]).unwrap();
        let output = job.run(frames(45)).await;

        assert_eq!(output.frames.len(), 45);
        assert!(output.frames[44].is_skipped());
        assert!(output.frames[44].skeleton.is_empty());
        assert_eq!(output.shots.len(), 1);
    }

    #[tokio::test]
    async fn test_stream_ending_mid_shot_is_abandoned() {
        let mut job = ShotAnalysisJob::new(fixture_config(), vec![scripted_backend()]).unwrap();
        let output = job.run(frames(20)).await;
        assert!(output.shots.is_empty());
        assert_eq!(output.abandoned_segments, 1);
        assert_eq!(job.tracker().phase(), ShotPhase::Idle);
    }

    #[test]
    fn test_process_detections_matches_async_path() {
        let mut job = ShotAnalysisJob::new(fixture_config(), Vec::new()).unwrap();
        let mut shots = 0;
        for (i, pose) in scripted_shot().iter().enumerate() {
            let outcome = job.process_detections(i, &[detection("fixture", i, pose)], None);
            if outcome.shot.is_some() {
                shots += 1;
            }
        }
        let output = job.finish();
        assert_eq!(shots, 1);
        assert_eq!(output.shots.len(), 1);
        assert_eq!(output.shots[0].report.segment.start_frame, 8);
    }

    #[test]
    fn test_unknown_backend_detection_dropped() {
        let mut job = ShotAnalysisJob::new(fixture_config(), Vec::new()).unwrap();
        let pose = Pose::new(170.0, Arm::Down { drop: 0.0 }, Ball::InHand);
        let outcome = job.process_detections(0, &[detection("ghost", 0, &pose)], None);
        assert!(outcome.skeleton.is_empty());
        assert_eq!(outcome.step.phase, ShotPhase::Idle);
    }

    #[test]
    fn test_invalid_config_is_fatal() {
        let mut config = fixture_config();
        config.tracker.min_run = 0;
        let err = ShotAnalysisJob::new(config, Vec::new()).unwrap_err();
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_analyze_image_locates_ball_and_renders() {
        let mut config = fixture_config();
        config.overlay.enabled = true;

        // Body joints without a ball; the locator finds it in the image.
        let pose = Pose::new(170.0, Arm::Up { elbow: 90.0 }, Ball::Gone);
        let backend = Arc::new(ReplayBackend::from_detections(
            "fixture",
            vec![detection("fixture", 0, &pose)],
        ));
        let job = ShotAnalysisJob::new(config, vec![backend]).unwrap();

        let wrist = skeleton(&pose).position(JointName::RightWrist).unwrap();
        let mut image = RgbImage::from_pixel(200, 200, Rgb([40, 40, 50]));
        draw_filled_circle_mut(
            &mut image,
            ((wrist.x * 200.0) as i32, ((wrist.y - 0.04) * 200.0) as i32),
            6,
            Rgb([230, 100, 20]),
        );

        let analysis = job.analyze_image(&Frame::new(0).with_image(image.clone())).await;
        assert_eq!(analysis.tier_used, Some(AnalysisTier::Free));
        assert_eq!(analysis.side, Some(Side::Right));
        let ball = analysis.skeleton.get(JointName::BallPosition).unwrap();
        assert!(ball.sources().contains(BALL_SOURCE));
        assert!(analysis.angles.get(AngleName::Release).is_some());
        assert_eq!(analysis.angles.get(AngleName::VerticalDisplacement), None);

        let overlay = analysis.overlay.unwrap();
        assert_eq!(overlay.dimensions(), image.dimensions());
        assert_ne!(overlay, image);
    }

    #[tokio::test]
    async fn test_pixel_backend_sized_from_frame_image() {
        let mut config = fixture_config();
        config.backends.push(BackendProfileConfig {
            id: "openpose".to_string(),
            schema: SchemaSource::builtin(BuiltinSchema::Body25),
            reliability: 0.8,
            min_confidence: 0.1,
        });
        config.tiers.insert(AnalysisTier::Free, vec!["openpose".to_string()]);

        // Pixel coordinates and no frame size of its own
        let backend = Arc::new(ReplayBackend::from_detections(
            "openpose",
            vec![Detection::new("openpose", 0)
                .with_keypoint(8usize, hoopform_models::RawKeypoint::new(320.0, 240.0, 0.9))],
        ));
        let mut job = ShotAnalysisJob::new(config, vec![backend]).unwrap();

        let frame = Frame::new(0).with_image(RgbImage::from_pixel(640, 480, Rgb([40, 40, 50])));
        let outcome = job.process_frame(&frame).await;
        assert_eq!(outcome.tier_used, Some(AnalysisTier::Free));
        let hip = outcome.skeleton.position(JointName::HipCenter).unwrap();
        assert!((hip.x - 0.5).abs() < 1e-9);
        assert!((hip.y - 0.5).abs() < 1e-9);
    }

    /// Court frame with the pose's ball drawn in, if it is visible.
    fn court_frame(pose: &Pose) -> RgbImage {
        const SIZE: f64 = 400.0;
        let mut image = RgbImage::from_pixel(400, 400, Rgb([40, 40, 50]));
        if let Some(ball) = skeleton(pose).position(JointName::BallPosition) {
            let center = ((ball.x * SIZE).round() as i32, (ball.y * SIZE).round() as i32);
            draw_filled_circle_mut(&mut image, center, 8, Rgb([230, 100, 20]));
        }
        image
    }

    #[test]
    fn test_ball_found_in_image_after_it_leaves_the_hand() {
        // The backend never reports the ball; only the image shows it.
        let mut job = ShotAnalysisJob::new(fixture_config(), Vec::new()).unwrap();
        for (i, pose) in scripted_shot().iter().enumerate() {
            let body = Pose::new(pose.knee, pose.arm, Ball::Gone);
            let image = court_frame(pose);
            job.process_detections(i, &[detection("fixture", i, &body)], Some(&image));
        }
        let output = job.finish();

        assert_eq!(output.abandoned_segments, 0);
        assert_eq!(output.shots.len(), 1);
        let segment = &output.shots[0].report.segment;
        assert_eq!(segment.start_frame, 8);
        assert!(segment.phases_visited().contains(&ShotPhase::FollowThrough));

        // Frame 25 has the ball well above the wrist window.
        let flight = &output.frames[25].skeleton;
        let ball = flight.get(JointName::BallPosition).unwrap();
        assert!(ball.sources().contains(BALL_SOURCE));
        assert!((ball.position().y - 0.14).abs() < 0.01);
    }

    #[test]
    fn test_stored_outcomes_drop_overlays() {
        let mut config = fixture_config();
        config.overlay.enabled = true;
        let mut job = ShotAnalysisJob::new(config, Vec::new()).unwrap();

        let poses = scripted_shot();
        for (i, pose) in poses.iter().take(3).enumerate() {
            let image = court_frame(pose);
            let outcome = job.process_detections(i, &[detection("fixture", i, pose)], Some(&image));
            let overlay = outcome.overlay.unwrap();
            assert_eq!(overlay.dimensions(), (400, 400));
        }

        let output = job.finish();
        assert_eq!(output.frames.len(), 3);
        assert!(output.frames.iter().all(|f| f.overlay.is_none()));
        assert!(output.frames.iter().all(|f| !f.skeleton.is_empty()));
    }

    #[tokio::test]
    async fn test_run_jobs_keeps_input_order() {
        let short = ShotAnalysisJob::new(fixture_config(), vec![scripted_backend()]).unwrap();
        let full = ShotAnalysisJob::new(fixture_config(), vec![scripted_backend()]).unwrap();

        let results = run_jobs(vec![(short, frames(20)), (full, frames(40))]).await;
        assert_eq!(results.len(), 2);
        let first = results[0].as_ref().unwrap();
        let second = results[1].as_ref().unwrap();
        assert_eq!(first.frames.len(), 20);
        assert_eq!(first.abandoned_segments, 1);
        assert_eq!(second.shots.len(), 1);
        assert_eq!(
            second.shots[0].report.label(QualityCategory::KneeBend),
            Some(QualityLabel::Good)
        );
    }
}
