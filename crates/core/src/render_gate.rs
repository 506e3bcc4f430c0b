use pagemark_model::{PageIndex, ZoomFactor};

/// Identifies one requested page raster. Only the newest ticket for the
/// current page and zoom may be committed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderTicket {
    pub page: PageIndex,
    pub zoom: ZoomFactor,
    pub generation: u64,
}

/// Cancels in-flight renders by replacement: every navigation or zoom change
/// starts a new generation and older tickets stop being accepted.
#[derive(Debug, Default)]
pub struct RenderGate {
    generation: u64,
}

impl RenderGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn begin_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    pub fn issue(&self, page: PageIndex, zoom: ZoomFactor) -> RenderTicket {
        RenderTicket { page, zoom, generation: self.generation }
    }

    pub fn accepts(&self, ticket: &RenderTicket, page: PageIndex, zoom: ZoomFactor) -> bool {
        ticket.generation == self.generation && ticket.page == page && ticket.zoom == zoom
    }
}
