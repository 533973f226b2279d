/// Network link the telemetry transport rides on.
///
/// Bringing the link up, and keeping it up, is the platform's business; the
/// node only waits for it.
#[allow(async_fn_in_trait)]
pub trait Link {
    /// Resolves every time the link comes up.
    async fn connected(&mut self);
}

pub struct Connectivity<L> {
    link: L,
    connections: u32,
}

impl<L: Link> Connectivity<L> {
    pub fn new(link: L) -> Self {
        Self {
            link,
            connections: 0,
        }
    }

    /// Waits for the next connection and returns how many there have been.
    pub async fn wait_connected(&mut self) -> u32 {
        self.link.connected().await;
        self.connections = self.connections.wrapping_add(1);
        self.connections
    }

    pub async fn run(mut self) {
        loop {
            let connections = self.wait_connected().await;
            if connections == 1 {
                info!("link: up");
            } else {
                warn!("link: up again, {} connections so far", connections);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use embassy_futures::block_on;

    use super::*;

    struct Flaky;

    impl Link for Flaky {
        async fn connected(&mut self) {}
    }

    #[test]
    fn counts_connections() {
        let mut connectivity = Connectivity::new(Flaky);

        assert_eq!(block_on(connectivity.wait_connected()), 1);
        assert_eq!(block_on(connectivity.wait_connected()), 2);
    }
}
