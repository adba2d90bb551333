//! Host/GPU synchronization for the capture protocol.
//!
//! wgpu has no user-visible fences or semaphores. A [`CaptureFence`] is the
//! index of the last submission the host must wait for, and a
//! [`RenderCompleteSignal`] is the index of the render submission a copy
//! depends on. Both follow the same discipline as their Vulkan counterparts:
//! a fence must be reset before it is armed again, and a signal is consumed
//! exactly once.

use std::time::Duration;

use crate::error::{RenderError, RenderResult};

/// Repeatedly waits until `poll` reports completion.
///
/// A timed-out attempt is retried with the same timeout. Any other failure is
/// returned. On success the number of timed-out attempts is returned.
pub fn wait_with_retry<F>(mut poll: F, timeout: Duration) -> RenderResult<u32>
where
    F: FnMut(Duration) -> Result<wgpu::PollStatus, wgpu::PollError>,
{
    let mut retries = 0u32;
    loop {
        match poll(timeout) {
            Ok(_) => return Ok(retries),
            Err(wgpu::PollError::Timeout) => {
                retries = retries.saturating_add(1);
                log::trace!("fence wait timed out after {timeout:?}, retry {retries}");
            }
            Err(err) => return Err(err.into()),
        }
    }
}

/// Single host-side fence, reused across submissions.
#[derive(Debug, Default)]
pub struct CaptureFence {
    pending: Option<wgpu::SubmissionIndex>,
}

impl CaptureFence {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches the fence to a submission. The fence must be unarmed.
    pub fn arm(&mut self, submission: wgpu::SubmissionIndex) -> RenderResult<()> {
        if self.pending.is_some() {
            return Err(RenderError::FenceAlreadyArmed);
        }
        self.pending = Some(submission);
        Ok(())
    }

    /// Whether a submission is attached.
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.pending.is_some()
    }

    /// Blocks until the attached submission completes, retrying on timeout.
    ///
    /// The fence stays armed; call [`CaptureFence::reset`] afterwards.
    pub fn wait(&self, device: &wgpu::Device, timeout: Duration) -> RenderResult<u32> {
        let index = self.pending.as_ref().ok_or(RenderError::FenceNotArmed)?;
        wait_with_retry(
            |timeout| {
                device.poll(wgpu::PollType::Wait {
                    submission_index: Some(index.clone()),
                    timeout: Some(timeout),
                })
            },
            timeout,
        )
    }

    /// Detaches the submission so the fence can be armed again.
    pub fn reset(&mut self) {
        self.pending = None;
    }
}

/// GPU-to-GPU ordering token between the render and the copy submission.
#[derive(Debug, Default)]
pub struct RenderCompleteSignal {
    signaled_by: Option<wgpu::SubmissionIndex>,
}

impl RenderCompleteSignal {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the render submission that signals this semaphore.
    pub fn signal(&mut self, submission: wgpu::SubmissionIndex) {
        if self.signaled_by.is_some() {
            log::warn!("render-complete signal overwritten before being consumed");
        }
        self.signaled_by = Some(submission);
    }

    /// Whether a render submission is pending consumption.
    #[must_use]
    pub fn is_signaled(&self) -> bool {
        self.signaled_by.is_some()
    }

    /// Takes the signal for a dependent submission.
    ///
    /// Work on the single queue executes in submission order, so a copy
    /// submitted after consuming the signal starts only after the render.
    pub fn consume(&mut self) -> RenderResult<wgpu::SubmissionIndex> {
        self.signaled_by.take().ok_or(RenderError::MissingRenderSignal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wait_succeeds_immediately() {
        let retries = wait_with_retry(|_| Ok(wgpu::PollStatus::WaitSucceeded), Duration::ZERO)
            .unwrap();
        assert_eq!(retries, 0);
    }

    #[test]
    fn test_wait_retries_timeouts() {
        let mut attempts = 0;
        let retries = wait_with_retry(
            |timeout| {
                assert_eq!(timeout, Duration::from_nanos(10_000));
                attempts += 1;
                if attempts < 4 {
                    Err(wgpu::PollError::Timeout)
                } else {
                    Ok(wgpu::PollStatus::WaitSucceeded)
                }
            },
            Duration::from_nanos(10_000),
        )
        .unwrap();
        assert_eq!(retries, 3);
        assert_eq!(attempts, 4);
    }

    #[test]
    fn test_queue_empty_counts_as_completion() {
        let retries =
            wait_with_retry(|_| Ok(wgpu::PollStatus::QueueEmpty), Duration::from_millis(1))
                .unwrap();
        assert_eq!(retries, 0);
    }

    #[test]
    fn test_unarmed_fence_state() {
        let mut fence = CaptureFence::new();
        assert!(!fence.is_armed());
        fence.reset();
        assert!(!fence.is_armed());
    }

    #[test]
    fn test_unsignaled_signal_cannot_be_consumed() {
        let mut signal = RenderCompleteSignal::new();
        assert!(!signal.is_signaled());
        assert!(matches!(
            signal.consume(),
            Err(RenderError::MissingRenderSignal)
        ));
    }
}
