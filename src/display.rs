// Fullscreen display state
// Owns the source image and the single currently-shown frame, independent of the windowing backend

use crate::fit::{fit_to_window, RenderedImage};
use crate::image_loader::SourceImage;
use crate::input::{dismiss_shortcut, ModifierState};
use log::{debug, info};
use smithay_client_toolkit::seat::keyboard::Keysym;
use std::time::Instant;

/// Display lifecycle. There is no terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayState {
    /// No frame has been rendered yet
    Initializing,
    /// A frame matching the current window size is held
    Displayed,
}

/// What the backend should do after an input or close event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventResponse {
    /// The event was consumed and its default behavior must not run
    Suppressed,
    /// Not a dismissal event; nothing to do
    Ignored,
}

pub struct FullscreenDisplay {
    source: SourceImage,
    rendered: Option<RenderedImage>,
    resamples: u64,
}

impl FullscreenDisplay {
    pub fn new(source: SourceImage) -> Self {
        Self {
            source,
            rendered: None,
            resamples: 0,
        }
    }

    pub fn state(&self) -> DisplayState {
        match self.rendered {
            Some(_) => DisplayState::Displayed,
            None => DisplayState::Initializing,
        }
    }

    /// The frame currently shown, if any
    pub fn rendered(&self) -> Option<&RenderedImage> {
        self.rendered.as_ref()
    }

    /// Resample the source to the new window size and replace the shown frame.
    ///
    /// Runs on every call, even if the size did not change.
    pub fn resize_image(&mut self, width: u32, height: u32) -> &RenderedImage {
        let started = Instant::now();
        let frame = fit_to_window(&self.source, width, height);
        self.resamples += 1;

        debug!(
            "Resampled {}x{} -> {}x{} in {:?} (#{})",
            self.source.width(),
            self.source.height(),
            frame.width(),
            frame.height(),
            started.elapsed(),
            self.resamples
        );

        self.rendered.insert(frame)
    }

    /// The compositor asked the window to close
    pub fn on_close_request(&self) -> EventResponse {
        info!("Close request suppressed");
        EventResponse::Suppressed
    }

    pub fn on_key(&self, keysym: Keysym, modifiers: ModifierState) -> EventResponse {
        match dismiss_shortcut(keysym, modifiers) {
            Some(shortcut) => {
                debug!("Suppressed dismissal shortcut: {:?}", shortcut);
                EventResponse::Suppressed
            }
            None => EventResponse::Ignored,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn display_of(width: u32, height: u32) -> FullscreenDisplay {
        let pixels = RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x % 256) as u8, (y % 256) as u8, 128, 255])
        });
        FullscreenDisplay::new(SourceImage::from_rgba(pixels))
    }

    #[test]
    fn starts_initializing_without_frame() {
        let display = display_of(8, 8);
        assert_eq!(display.state(), DisplayState::Initializing);
        assert!(display.rendered().is_none());
    }

    #[test]
    fn first_resize_enters_displayed() {
        let mut display = display_of(8, 8);
        let frame = display.resize_image(20, 10);
        assert_eq!((frame.width(), frame.height()), (20, 10));
        assert_eq!(display.state(), DisplayState::Displayed);
    }

    #[test]
    fn each_resize_replaces_the_frame() {
        let mut display = display_of(64, 36);
        display.resize_image(256, 144);
        display.resize_image(80, 60);

        let frame = display.rendered().unwrap();
        assert_eq!((frame.width(), frame.height()), (80, 60));
        assert_eq!(display.state(), DisplayState::Displayed);
    }

    #[test]
    fn unchanged_geometry_still_resamples_identically() {
        let mut display = display_of(30, 20);
        let first = display.resize_image(47, 31).clone();
        let second = display.resize_image(47, 31).clone();

        assert_eq!(first, second);
    }

    #[test]
    fn dismissal_events_are_suppressed() {
        let mut display = display_of(4, 4);
        display.resize_image(10, 10);

        let ctrl = ModifierState { ctrl: true, alt: false };
        let alt = ModifierState { ctrl: false, alt: true };

        assert_eq!(display.on_close_request(), EventResponse::Suppressed);
        assert_eq!(display.on_key(Keysym::F4, alt), EventResponse::Suppressed);
        assert_eq!(display.on_key(Keysym::w, ctrl), EventResponse::Suppressed);
        assert_eq!(display.on_key(Keysym::Escape, ModifierState::default()), EventResponse::Suppressed);

        assert_eq!(display.state(), DisplayState::Displayed);
        assert_eq!(display.rendered().map(|f| f.width()), Some(10));
    }

    #[test]
    fn other_keys_are_ignored() {
        let display = display_of(4, 4);
        assert_eq!(display.on_key(Keysym::a, ModifierState::default()), EventResponse::Ignored);
        assert_eq!(display.on_key(Keysym::Return, ModifierState::default()), EventResponse::Ignored);
    }
}
