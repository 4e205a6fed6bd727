//! Upload/capture state for the analyzer page.
//!
//! The controller is independent of the DOM: the camera stream and the preview
//! handle are type parameters so the transitions can be exercised natively.

/// A live media stream whose tracks can be stopped.
pub trait MediaTracks {
    fn stop_all_tracks(&self);
}

/// Exclusive owner of an open camera stream. Every track is stopped when the
/// guard is dropped.
pub struct CameraGuard<S: MediaTracks> {
    stream: S,
}

impl<S: MediaTracks> CameraGuard<S> {
    pub fn new(stream: S) -> Self {
        Self { stream }
    }

    pub fn stream(&self) -> &S {
        &self.stream
    }
}

impl<S: MediaTracks> Drop for CameraGuard<S> {
    fn drop(&mut self) {
        self.stream.stop_all_tracks();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadPhase {
    Idle,
    PreviewShown,
    Uploading,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ControllerError {
    #[error("An analysis is already in progress.")]
    Busy,
    #[error("Only image files can be analyzed (got {0}).")]
    NotAnImage(String),
    #[error("Close the camera before uploading a file.")]
    CameraOpen,
    #[error("The camera is not open.")]
    CameraClosed,
}

pub struct UploadController<S: MediaTracks, P> {
    phase: UploadPhase,
    preview: Option<P>,
    camera: Option<CameraGuard<S>>,
    camera_error: Option<String>,
    capturing: bool,
}

impl<S: MediaTracks, P> Default for UploadController<S, P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: MediaTracks, P> UploadController<S, P> {
    pub fn new() -> Self {
        Self {
            phase: UploadPhase::Idle,
            preview: None,
            camera: None,
            camera_error: None,
            capturing: false,
        }
    }

    pub fn phase(&self) -> UploadPhase {
        self.phase
    }

    pub fn is_loading(&self) -> bool {
        self.phase == UploadPhase::Uploading
    }

    pub fn preview(&self) -> Option<&P> {
        self.preview.as_ref()
    }

    pub fn is_camera_open(&self) -> bool {
        self.camera.is_some()
    }

    pub fn is_capturing(&self) -> bool {
        self.capturing
    }

    pub fn camera_stream(&self) -> Option<&S> {
        self.camera.as_ref().map(CameraGuard::stream)
    }

    pub fn camera_error(&self) -> Option<&str> {
        self.camera_error.as_deref()
    }

    /// Replaces the preview and enters `Uploading`. The previous preview is
    /// dropped.
    pub fn begin_upload(&mut self, mime_type: &str, preview: P) -> Result<(), ControllerError> {
        if self.is_loading() {
            return Err(ControllerError::Busy);
        }
        if self.is_camera_open() {
            return Err(ControllerError::CameraOpen);
        }
        if !mime_type.starts_with("image/") {
            return Err(ControllerError::NotAnImage(mime_type.to_string()));
        }
        self.preview = Some(preview);
        self.phase = UploadPhase::Uploading;
        Ok(())
    }

    /// Leaves `Uploading` after a response or a failure.
    pub fn finish_upload(&mut self) {
        self.phase = if self.preview.is_some() {
            UploadPhase::PreviewShown
        } else {
            UploadPhase::Idle
        };
    }

    pub fn can_open_camera(&self) -> Result<(), ControllerError> {
        if self.is_loading() {
            return Err(ControllerError::Busy);
        }
        Ok(())
    }

    /// Takes ownership of a newly granted stream. A stream that arrives while
    /// an upload is running is stopped immediately.
    pub fn open_camera(&mut self, stream: S) -> Result<(), ControllerError> {
        let guard = CameraGuard::new(stream);
        self.can_open_camera()?;
        self.camera = Some(guard);
        self.camera_error = None;
        self.capturing = false;
        Ok(())
    }

    pub fn camera_failed(&mut self, message: impl Into<String>) {
        self.close_camera();
        self.camera_error = Some(message.into());
    }

    pub fn begin_capture(&mut self) -> Result<(), ControllerError> {
        if !self.is_camera_open() {
            return Err(ControllerError::CameraClosed);
        }
        if self.capturing || self.is_loading() {
            return Err(ControllerError::Busy);
        }
        self.capturing = true;
        Ok(())
    }

    /// Stops the camera and submits the captured frame like a selected file.
    /// A frame that arrives after the capture was cancelled is refused.
    pub fn finish_capture(&mut self, mime_type: &str, preview: P) -> Result<(), ControllerError> {
        if !self.capturing {
            return Err(ControllerError::CameraClosed);
        }
        self.close_camera();
        self.begin_upload(mime_type, preview)
    }

    pub fn capture_failed(&mut self) {
        self.close_camera();
    }

    pub fn cancel_camera(&mut self) {
        self.close_camera();
        self.camera_error = None;
    }

    /// Releases everything the controller owns.
    pub fn teardown(&mut self) {
        self.close_camera();
        self.preview = None;
        self.phase = UploadPhase::Idle;
    }

    fn close_camera(&mut self) {
        self.camera = None;
        self.capturing = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    struct FakeStream {
        live_tracks: Rc<Cell<usize>>,
    }

    impl MediaTracks for FakeStream {
        fn stop_all_tracks(&self) {
            self.live_tracks.set(0);
        }
    }

    fn fake_stream(tracks: usize) -> (FakeStream, Rc<Cell<usize>>) {
        let live_tracks = Rc::new(Cell::new(tracks));
        (
            FakeStream {
                live_tracks: live_tracks.clone(),
            },
            live_tracks,
        )
    }

    type Controller = UploadController<FakeStream, &'static str>;

    #[test]
    fn file_upload_moves_through_phases() {
        let mut controller = Controller::new();
        assert_eq!(controller.phase(), UploadPhase::Idle);

        controller.begin_upload("image/png", "blob:first").unwrap();
        assert!(controller.is_loading());
        assert_eq!(controller.preview(), Some(&"blob:first"));

        controller.finish_upload();
        assert_eq!(controller.phase(), UploadPhase::PreviewShown);

        controller.begin_upload("image/jpeg", "blob:second").unwrap();
        assert_eq!(controller.preview(), Some(&"blob:second"));
    }

    #[test]
    fn overlapping_and_non_image_uploads_are_rejected() {
        let mut controller = Controller::new();
        assert_eq!(
            controller.begin_upload("text/plain", "blob:x"),
            Err(ControllerError::NotAnImage("text/plain".to_string()))
        );
        assert_eq!(controller.phase(), UploadPhase::Idle);

        controller.begin_upload("image/png", "blob:first").unwrap();
        assert_eq!(controller.begin_upload("image/png", "blob:second"), Err(ControllerError::Busy));
        assert_eq!(controller.preview(), Some(&"blob:first"));
    }

    #[test]
    fn capture_stops_every_track() {
        let mut controller = Controller::new();
        let (stream, live) = fake_stream(2);
        controller.open_camera(stream).unwrap();
        assert!(controller.is_camera_open());
        assert_eq!(live.get(), 2);

        controller.begin_capture().unwrap();
        controller.finish_capture("image/jpeg", "blob:capture").unwrap();

        assert_eq!(live.get(), 0);
        assert!(!controller.is_camera_open());
        assert!(controller.is_loading());
    }

    #[test]
    fn failed_capture_still_stops_tracks() {
        let mut controller = Controller::new();
        let (stream, live) = fake_stream(1);
        controller.open_camera(stream).unwrap();
        controller.begin_capture().unwrap();
        assert_eq!(controller.begin_capture(), Err(ControllerError::Busy));

        controller.capture_failed();
        assert_eq!(live.get(), 0);
        assert_eq!(controller.phase(), UploadPhase::Idle);
        assert!(!controller.is_capturing());
    }

    #[test]
    fn frame_arriving_after_cancel_is_not_uploaded() {
        let mut controller = Controller::new();
        let (stream, live) = fake_stream(1);
        controller.open_camera(stream).unwrap();
        controller.begin_capture().unwrap();
        controller.cancel_camera();

        assert_eq!(
            controller.finish_capture("image/jpeg", "blob:late"),
            Err(ControllerError::CameraClosed)
        );
        assert_eq!(live.get(), 0);
        assert_eq!(controller.phase(), UploadPhase::Idle);
        assert!(controller.preview().is_none());
    }

    #[test]
    fn cancel_stops_every_track() {
        let mut controller = Controller::new();
        let (stream, live) = fake_stream(2);
        controller.open_camera(stream).unwrap();

        controller.cancel_camera();
        assert_eq!(live.get(), 0);
        assert!(!controller.is_camera_open());
        assert_eq!(controller.phase(), UploadPhase::Idle);
    }

    #[test]
    fn dropping_the_controller_stops_tracks() {
        let (stream, live) = fake_stream(1);
        {
            let mut controller = Controller::new();
            controller.open_camera(stream).unwrap();
        }
        assert_eq!(live.get(), 0);
    }

    #[test]
    fn teardown_releases_camera_and_preview() {
        let mut controller = Controller::new();
        controller.begin_upload("image/png", "blob:first").unwrap();
        controller.finish_upload();
        let (stream, live) = fake_stream(1);
        controller.open_camera(stream).unwrap();

        controller.teardown();
        assert_eq!(live.get(), 0);
        assert!(controller.preview().is_none());
        assert_eq!(controller.phase(), UploadPhase::Idle);
    }

    #[test]
    fn reopening_the_camera_stops_the_previous_stream() {
        let mut controller = Controller::new();
        let (first, first_live) = fake_stream(1);
        let (second, second_live) = fake_stream(1);
        controller.open_camera(first).unwrap();
        controller.open_camera(second).unwrap();

        assert_eq!(first_live.get(), 0);
        assert_eq!(second_live.get(), 1);
    }

    #[test]
    fn stream_granted_during_upload_is_stopped() {
        let mut controller = Controller::new();
        controller.begin_upload("image/png", "blob:first").unwrap();
        let (stream, live) = fake_stream(1);

        assert_eq!(controller.open_camera(stream), Err(ControllerError::Busy));
        assert_eq!(live.get(), 0);
        assert!(!controller.is_camera_open());
    }

    #[test]
    fn uploads_wait_for_the_camera_to_close() {
        let mut controller = Controller::new();
        let (stream, _live) = fake_stream(1);
        controller.open_camera(stream).unwrap();
        assert_eq!(
            controller.begin_upload("image/png", "blob:x"),
            Err(ControllerError::CameraOpen)
        );
    }

    #[test]
    fn camera_errors_are_kept_until_cancel() {
        let mut controller = Controller::new();
        controller.camera_failed("Unable to access camera. Please check permissions.");
        assert_eq!(
            controller.camera_error(),
            Some("Unable to access camera. Please check permissions.")
        );
        assert!(!controller.is_camera_open());

        controller.begin_upload("image/png", "blob:first").unwrap();
        controller.cancel_camera();
        assert_eq!(controller.camera_error(), None);
    }
}
