/*
 *  display/scheduler.rs
 *
 *  spotify-oled - now playing, at a glance
 *  (c) 2020-26 Stuart Hunter
 *
 *  Frame loop, draws the elements on a dedicated thread at a capped rate
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use std::any::Any;
use std::fmt::Debug;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use log::{debug, error, info};
use tokio::sync::watch;

use crate::clock;
use crate::display::components::Element;
use crate::display::content::UiContent;
use crate::display::error::DisplayError;
use crate::display::traits::DisplayDriver;
use crate::poller::ContentSink;

type FaultCell = Arc<Mutex<Option<DisplayError>>>;

fn lock_fault(fault: &FaultCell) -> MutexGuard<'_, Option<DisplayError>> {
    fault.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Owns the frame thread.
///
/// Content goes in through [`FrameScheduler::push`], which only ever keeps the
/// newest value; the thread picks it up at the top of its next frame. A frame
/// that fails or panics stops the thread and leaves its error in a fault cell,
/// which the owner reads with [`FrameScheduler::check`] whenever it suits it.
pub struct FrameScheduler {
    handle: Option<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
    content_tx: watch::Sender<UiContent>,
    fault: FaultCell,
    reported: AtomicBool,
}

impl FrameScheduler {
    /// Start drawing `elements` onto `driver`, at most one frame per `min_frame`
    pub fn spawn<D>(driver: D, elements: Vec<Element>, min_frame: Duration) -> Result<Self, DisplayError>
    where
        D: DisplayDriver + DrawTarget<Color = BinaryColor> + Send + 'static,
        D::Error: Debug,
    {
        let shutdown = Arc::new(AtomicBool::new(false));
        let fault: FaultCell = Arc::new(Mutex::new(None));
        let (content_tx, content_rx) = watch::channel(UiContent::empty(clock::now_ms()));

        let frame_loop = FrameLoop {
            driver,
            elements,
            content_rx,
            min_frame,
        };
        let thread_shutdown = Arc::clone(&shutdown);
        let thread_fault = Arc::clone(&fault);

        let handle = thread::Builder::new()
            .name("frame-loop".to_string())
            .spawn(move || frame_loop.run(&thread_shutdown, &thread_fault))
            .map_err(|e| DisplayError::Other(format!("Failed to spawn frame thread: {}", e)))?;

        info!("Frame loop started, min frame time {}ms", min_frame.as_millis());

        Ok(Self {
            handle: Some(handle),
            shutdown,
            content_tx,
            fault,
            reported: AtomicBool::new(false),
        })
    }

    /// Replace whatever content the next frame will show
    pub fn push(&self, content: UiContent) {
        self.content_tx.send_replace(content);
    }

    /// Take a latched frame loop fault, if any.
    ///
    /// The fault itself is handed out once; later calls on the dead loop
    /// return [`DisplayError::FrameLoopStopped`].
    pub fn check(&self) -> Result<(), DisplayError> {
        // a thread seen finished has already latched its fault
        let exited = self.handle.as_ref().is_none_or(|handle| handle.is_finished());
        if let Some(fault) = lock_fault(&self.fault).take() {
            self.reported.store(true, Ordering::Release);
            return Err(fault);
        }
        if self.reported.load(Ordering::Acquire) {
            return Err(DisplayError::FrameLoopStopped);
        }
        if exited && !self.shutdown.load(Ordering::Acquire) {
            return Err(DisplayError::FrameLoopPanicked("frame thread exited without a fault".to_string()));
        }
        Ok(())
    }

    /// Stop the loop, wait for it to exit and report how it ended
    pub fn finish(mut self) -> Result<(), DisplayError> {
        self.stop()?;
        match lock_fault(&self.fault).take() {
            Some(fault) => Err(fault),
            None => Ok(()),
        }
    }

    fn stop(&mut self) -> Result<(), DisplayError> {
        self.shutdown.store(true, Ordering::Release);
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };

        handle.thread().unpark();
        handle
            .join()
            .map_err(|payload| DisplayError::FrameLoopPanicked(panic_message(payload.as_ref())))?;
        debug!("Frame loop joined");
        Ok(())
    }
}

impl ContentSink for FrameScheduler {
    fn push(&self, content: UiContent) {
        FrameScheduler::push(self, content);
    }

    fn check(&self) -> Result<(), DisplayError> {
        FrameScheduler::check(self)
    }
}

impl Drop for FrameScheduler {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            error!("Frame loop ended badly: {}", e);
        }
    }
}

struct FrameLoop<D> {
    driver: D,
    elements: Vec<Element>,
    content_rx: watch::Receiver<UiContent>,
    min_frame: Duration,
}

impl<D> FrameLoop<D>
where
    D: DisplayDriver + DrawTarget<Color = BinaryColor>,
    D::Error: Debug,
{
    fn run(mut self, shutdown: &AtomicBool, fault: &FaultCell) {
        let mut frames = 0u64;

        while !shutdown.load(Ordering::Acquire) {
            let started = Instant::now();

            let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.frame()))
                .unwrap_or_else(|payload| Err(DisplayError::FrameLoopPanicked(panic_message(payload.as_ref()))));
            if let Err(e) = outcome {
                error!("Frame {} failed, stopping the frame loop: {}", frames, e);
                *lock_fault(fault) = Some(e);
                return;
            }
            frames += 1;

            // unpark() from stop() cuts the wait short
            if let Some(rest) = self.min_frame.checked_sub(started.elapsed()) {
                thread::park_timeout(rest);
            }
        }

        debug!("Frame loop stopped after {} frames", frames);
    }

    fn frame(&mut self) -> Result<(), DisplayError> {
        let now_ms = clock::now_ms();

        if self.content_rx.has_changed().unwrap_or(false) {
            let content = self.content_rx.borrow_and_update().clone();
            for element in self.elements.iter_mut() {
                element.update(&content);
            }
        }

        self.driver
            .clear(BinaryColor::Off)
            .map_err(|e| DisplayError::DrawingError(format!("{:?}", e)))?;
        for element in &self.elements {
            element
                .render(&mut self.driver, now_ms)
                .map_err(|e| DisplayError::DrawingError(format!("{:?}", e)))?;
        }

        self.driver.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ContentConfig;
    use crate::display::components::now_playing_layout;
    use crate::display::drivers::headless::HeadlessDriver;
    use crate::display::fonts::MonoMeasure;

    fn scheduler(driver: HeadlessDriver) -> FrameScheduler {
        let elements = now_playing_layout(
            &ContentConfig::default(),
            128,
            64,
            Arc::new(MonoMeasure),
            &UiContent::empty(0),
        );
        FrameScheduler::spawn(driver, elements, Duration::from_millis(5)).unwrap()
    }

    fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        false
    }

    #[test]
    fn test_frames_are_flushed() {
        let driver = HeadlessDriver::new(128, 64);
        let state = driver.state();
        let scheduler = scheduler(driver);

        assert!(wait_for(|| state.lock().unwrap().flush_count >= 3));
        assert!(scheduler.check().is_ok());
        assert!(scheduler.finish().is_ok());
    }

    #[test]
    fn test_pushed_content_is_drawn() {
        let driver = HeadlessDriver::new(128, 64);
        let state = driver.state();
        let scheduler = scheduler(driver);

        scheduler.push(UiContent {
            title: "Stopped".into(),
            subtitle: "Nothing playing".into(),
            ..UiContent::empty(clock::now_ms())
        });

        assert!(wait_for(|| {
            state
                .lock()
                .unwrap()
                .last_frame
                .as_ref()
                .is_some_and(|frame| frame.count_on() > 0)
        }));
        scheduler.finish().unwrap();
    }

    #[test]
    fn test_flush_failure_is_latched() {
        let driver = HeadlessDriver::new(128, 64);
        let state = driver.state();
        state.lock().unwrap().simulate_flush_failure = true;
        let scheduler = scheduler(driver);

        let mut latched = None;
        assert!(wait_for(|| match scheduler.check() {
            Err(e) => {
                latched = Some(e);
                true
            }
            Ok(()) => false,
        }));
        assert!(matches!(latched, Some(DisplayError::FlushFailed(_))));
        assert_eq!(state.lock().unwrap().flush_count, 0);

        // the fault is reported once, the loop stays down
        assert!(matches!(scheduler.check(), Err(DisplayError::FrameLoopStopped)));
        assert!(matches!(scheduler.check(), Err(DisplayError::FrameLoopStopped)));
        assert!(scheduler.finish().is_ok());
    }

    #[test]
    fn test_panicking_frame_is_latched() {
        let driver = HeadlessDriver::new(128, 64);
        let state = driver.state();
        state.lock().unwrap().simulate_flush_panic = true;
        let scheduler = scheduler(driver);

        let mut latched = None;
        assert!(wait_for(|| match scheduler.check() {
            Err(e) => {
                latched = Some(e);
                true
            }
            Ok(()) => false,
        }));
        match latched {
            Some(DisplayError::FrameLoopPanicked(msg)) => assert!(msg.contains("simulated flush panic")),
            other => panic!("expected a latched panic, got {:?}", other),
        }
        assert!(matches!(scheduler.check(), Err(DisplayError::FrameLoopStopped)));
        assert!(scheduler.finish().is_ok());
    }

    #[test]
    fn test_no_frames_after_finish() {
        let driver = HeadlessDriver::new(128, 64);
        let state = driver.state();
        let scheduler = scheduler(driver);

        assert!(wait_for(|| state.lock().unwrap().flush_count >= 1));
        scheduler.finish().unwrap();

        let after = state.lock().unwrap().flush_count;
        thread::sleep(Duration::from_millis(30));
        assert_eq!(state.lock().unwrap().flush_count, after);
    }
}
