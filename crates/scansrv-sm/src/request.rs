//! Scan requests.
//!
//! A [`ScanRequest`] carries everything one scan cycle needs: the scan
//! parameters, the per-request driver-mode policy, and the two completion
//! callbacks. Callbacks are `FnOnce`, so each can be delivered at most once;
//! the service takes them out of the request right before invoking them.

use std::fmt;

use scansrv_core::{
    CommandStatus, PsRequest, RequestId, ScanCompleteReport, ScanParams,
};

/// Callback invoked once the scan command has been accepted (or the cycle
/// ended before the firmware acknowledged it).
pub type CommandAcceptedCallback = Box<dyn FnOnce(CommandStatus) + Send>;

/// Callback invoked exactly once when the scan cycle completes.
pub type ScanCompleteCallback = Box<dyn FnOnce(ScanCompleteReport) + Send>;

/// A request to run one scan cycle.
///
/// # Examples
///
/// ```
/// use scansrv_core::{ChannelEntry, PsRequest, ScanParams, ScanType};
/// use scansrv_sm::ScanRequest;
///
/// let params = ScanParams::new(ScanType::NormalActive)
///     .with_channel(ChannelEntry::basic(1, 10_000, 30_000));
///
/// let request = ScanRequest::new(params)
///     .with_high_priority(true)
///     .with_ps_request(PsRequest::PowerSaveOff)
///     .with_scan_on_driver_mode_failure(true)
///     .on_scan_complete(|report| println!("scan done: {}", report.status));
///
/// assert!(request.high_priority());
/// assert!(request.enter_driver_mode());
/// ```
pub struct ScanRequest {
    pub(crate) id: RequestId,
    pub(crate) params: ScanParams,
    pub(crate) high_priority: bool,
    pub(crate) enter_driver_mode: bool,
    pub(crate) scan_on_driver_mode_failure: bool,
    pub(crate) ps_request: PsRequest,
    pub(crate) send_null_data: bool,
    pub(crate) on_command_accepted: Option<CommandAcceptedCallback>,
    pub(crate) on_scan_complete: Option<ScanCompleteCallback>,
}

impl ScanRequest {
    /// Create a request that enters driver mode and aborts if that fails.
    pub fn new(params: ScanParams) -> Self {
        Self {
            id: RequestId::new(),
            params,
            high_priority: false,
            enter_driver_mode: true,
            scan_on_driver_mode_failure: false,
            ps_request: PsRequest::default(),
            send_null_data: false,
            on_command_accepted: None,
            on_scan_complete: None,
        }
    }

    /// Mark the scan as high priority for the HAL.
    pub fn with_high_priority(mut self, high_priority: bool) -> Self {
        self.high_priority = high_priority;
        self
    }

    /// Choose whether driver mode is reserved before scanning.
    ///
    /// When false the scan is issued right away and no release follows.
    pub fn with_enter_driver_mode(mut self, enter: bool) -> Self {
        self.enter_driver_mode = enter;
        self
    }

    /// Proceed with the scan even if driver mode cannot be entered.
    pub fn with_scan_on_driver_mode_failure(mut self, proceed: bool) -> Self {
        self.scan_on_driver_mode_failure = proceed;
        self
    }

    /// Power-save mode to request from the power server.
    pub fn with_ps_request(mut self, request: PsRequest) -> Self {
        self.ps_request = request;
        self
    }

    /// Send a null-data frame on power-save transitions.
    pub fn with_send_null_data(mut self, send: bool) -> Self {
        self.send_null_data = send;
        self
    }

    /// Register the command-accepted callback.
    pub fn on_command_accepted(
        mut self,
        callback: impl FnOnce(CommandStatus) + Send + 'static,
    ) -> Self {
        self.on_command_accepted = Some(Box::new(callback));
        self
    }

    /// Register the scan-complete callback.
    pub fn on_scan_complete(
        mut self,
        callback: impl FnOnce(ScanCompleteReport) + Send + 'static,
    ) -> Self {
        self.on_scan_complete = Some(Box::new(callback));
        self
    }

    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn params(&self) -> &ScanParams {
        &self.params
    }

    pub fn high_priority(&self) -> bool {
        self.high_priority
    }

    pub fn enter_driver_mode(&self) -> bool {
        self.enter_driver_mode
    }

    pub fn scan_on_driver_mode_failure(&self) -> bool {
        self.scan_on_driver_mode_failure
    }
}

impl fmt::Debug for ScanRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScanRequest")
            .field("id", &self.id)
            .field("params", &self.params)
            .field("high_priority", &self.high_priority)
            .field("enter_driver_mode", &self.enter_driver_mode)
            .field(
                "scan_on_driver_mode_failure",
                &self.scan_on_driver_mode_failure,
            )
            .field("ps_request", &self.ps_request)
            .field("send_null_data", &self.send_null_data)
            .field("on_command_accepted", &self.on_command_accepted.is_some())
            .field("on_scan_complete", &self.on_scan_complete.is_some())
            .finish()
    }
}
