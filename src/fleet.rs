//! Fleet controller - camera supervisor collection
//!
//! ## Responsibilities
//!
//! - Owning one stream supervisor per registered camera
//! - Lifecycle operations exposed to the admin surface (add, remove,
//!   restart, zone replacement, start/stop-all)
//! - Status and heartbeat aggregation
//!
//! Concurrent reads over the map; insert and remove synchronize through the
//! write lock. The detector, capture backend and reporter are shared across
//! all supervisors.

use crate::backend_client::Reporter;
use crate::capture::CaptureBackend;
use crate::config::Settings;
use crate::detector::Detector;
use crate::error::{Error, Result};
use crate::models::{CameraConfig, CameraInfo, CameraStatus, Heartbeat, ZonePolygon};
use crate::stream_supervisor::StreamSupervisor;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Manages the per-camera stream supervisors
pub struct FleetController {
    settings: Settings,
    detector: Arc<dyn Detector>,
    capture: Arc<dyn CaptureBackend>,
    reporter: Reporter,
    supervisors: RwLock<HashMap<String, Arc<StreamSupervisor>>>,
}

impl FleetController {
    pub fn new(
        settings: Settings,
        detector: Arc<dyn Detector>,
        capture: Arc<dyn CaptureBackend>,
        reporter: Reporter,
    ) -> Self {
        Self {
            settings,
            detector,
            capture,
            reporter,
            supervisors: RwLock::new(HashMap::new()),
        }
    }

    /// Register a camera and start its supervisor
    pub async fn add_camera(&self, config: CameraConfig) -> Result<CameraInfo> {
        if !self.detector.is_loaded() {
            return Err(Error::Precondition(
                "detection model is not loaded".to_string(),
            ));
        }

        let camera_id = config.camera_id.clone();
        let supervisor = {
            let mut supervisors = self.supervisors.write().await;
            if supervisors.contains_key(&camera_id) {
                return Err(Error::Conflict(format!(
                    "Camera {camera_id} already exists"
                )));
            }
            let supervisor = Arc::new(StreamSupervisor::new(
                config.clone(),
                self.settings.clone(),
                self.detector.clone(),
                self.capture.clone(),
                self.reporter.clone(),
            ));
            supervisors.insert(camera_id.clone(), supervisor.clone());
            supervisor
        };

        supervisor.start().await;
        tracing::info!(
            camera_id = %camera_id,
            url = %config.rtsp_url,
            "Camera added"
        );
        Ok(supervisor.get_info().await)
    }

    /// Stop and remove a camera
    pub async fn remove_camera(&self, camera_id: &str) -> Result<()> {
        let supervisor = self
            .supervisors
            .write()
            .await
            .remove(camera_id)
            .ok_or_else(|| Error::NotFound(format!("Camera {camera_id} not found")))?;
        supervisor.stop().await;
        tracing::info!(camera_id = %camera_id, "Camera removed");
        Ok(())
    }

    /// Restart a camera: stop, reset tracking and alert state, start
    pub async fn restart_camera(&self, camera_id: &str) -> Result<CameraInfo> {
        let supervisor = self.get(camera_id).await?;
        supervisor.restart().await;
        Ok(supervisor.get_info().await)
    }

    /// Replace scan/exit polygons for a running camera without restart
    pub async fn update_zones(
        &self,
        camera_id: &str,
        scan_zone: Option<ZonePolygon>,
        exit_zone: Option<ZonePolygon>,
    ) -> Result<()> {
        let supervisor = self.get(camera_id).await?;
        supervisor.update_zones(scan_zone, exit_zone).await;
        Ok(())
    }

    /// Status snapshot for one camera
    pub async fn camera_info(&self, camera_id: &str) -> Result<CameraInfo> {
        Ok(self.get(camera_id).await?.get_info().await)
    }

    /// Status snapshots for all cameras
    pub async fn list_cameras(&self) -> Vec<CameraInfo> {
        let supervisors: Vec<Arc<StreamSupervisor>> =
            self.supervisors.read().await.values().cloned().collect();
        let mut infos = Vec::with_capacity(supervisors.len());
        for supervisor in supervisors {
            infos.push(supervisor.get_info().await);
        }
        infos.sort_by(|a, b| a.camera_id.cmp(&b.camera_id));
        infos
    }

    /// Start every registered camera
    pub async fn start_all(&self) -> usize {
        let supervisors: Vec<Arc<StreamSupervisor>> =
            self.supervisors.read().await.values().cloned().collect();
        for supervisor in &supervisors {
            supervisor.start().await;
        }
        supervisors.len()
    }

    /// Stop every registered camera
    pub async fn stop_all(&self) -> usize {
        let supervisors: Vec<Arc<StreamSupervisor>> =
            self.supervisors.read().await.values().cloned().collect();
        for supervisor in &supervisors {
            supervisor.stop().await;
        }
        supervisors.len()
    }

    /// (total cameras, cameras currently running)
    pub async fn counts(&self) -> (usize, usize) {
        let infos = self.list_cameras().await;
        let active = infos
            .iter()
            .filter(|i| i.status == CameraStatus::Running)
            .count();
        (infos.len(), active)
    }

    /// Heartbeat payload for the backend
    pub async fn heartbeat(&self, uptime_seconds: f64) -> Heartbeat {
        let (cameras, active) = self.counts().await;
        Heartbeat {
            cameras,
            active,
            uptime_seconds,
        }
    }

    async fn get(&self, camera_id: &str) -> Result<Arc<StreamSupervisor>> {
        self.supervisors
            .read()
            .await
            .get(camera_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("Camera {camera_id} not found")))
    }
}
