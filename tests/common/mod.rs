#![allow(dead_code, unused_imports)]

pub use dib2cloud_test_utils::builders;
pub use dib2cloud_test_utils::fake_cloud::FakeCloudClient;
pub use dib2cloud_test_utils::fake_tool::{FakeBuildTool, FakeToolBehaviour, kill_pid};
pub use dib2cloud_test_utils::{init_tracing, with_timeout};

use std::sync::Arc;

use dib2cloud::app::App;
use dib2cloud::config::Config;

use builders::{ConfigBuilder, DiskimageBuilder, TestConfig};

pub const IMAGE: &str = "test-image";
pub const PROVIDER: &str = "test-provider";
pub const CLOUD: &str = "test-cloud";

/// Config with one two-element qcow2 diskimage, one provider and a fake
/// build tool, all rooted in a fresh temp dir.
pub struct Fixture {
    pub cfg: TestConfig,
    pub tool: FakeBuildTool,
}

impl Fixture {
    pub fn new(behaviour: FakeToolBehaviour) -> Self {
        init_tracing();
        let builder = ConfigBuilder::new();
        let tool = FakeBuildTool::install(&builder.root().join("bin"), behaviour)
            .expect("installing fake build tool");
        let cfg = builder
            .build_tool(&tool.command())
            .with_diskimage(
                DiskimageBuilder::new(IMAGE)
                    .element("e1")
                    .element("e2")
                    .build(),
            )
            .with_provider(PROVIDER, CLOUD)
            .build();
        Self { cfg, tool }
    }

    pub fn quick() -> Self {
        Self::new(FakeToolBehaviour::default())
    }

    pub fn slow() -> Self {
        Self::new(FakeToolBehaviour {
            sleep_secs: 30,
            produce_outputs: true,
        })
    }

    pub fn config(&self) -> Config {
        self.cfg.config.clone()
    }

    pub fn app(&self, cloud: FakeCloudClient) -> App {
        App::with_cloud(self.config(), Arc::new(cloud))
    }
}
