//! Headless device for tests. `None` on machines without a usable adapter, so
//! device tests return early there.

pub(crate) fn device() -> Option<(wgpu::Device, wgpu::Queue)> {
    pollster::block_on(async {
        let instance = wgpu::Instance::default();
        let options = |force_fallback_adapter| wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::LowPower,
            compatible_surface: None,
            force_fallback_adapter,
        };
        let adapter = match instance.request_adapter(&options(false)).await {
            Some(a) => a,
            None => instance.request_adapter(&options(true)).await?,
        };
        adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("penumbra_test_device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: adapter.limits(),
                    memory_hints: wgpu::MemoryHints::default(),
                },
                None,
            )
            .await
            .ok()
    })
}

/// Whether `device` can hold the seven float G-buffer attachments.
pub(crate) fn fits_gbuffer(device: &wgpu::Device) -> bool {
    let limits = device.limits();
    limits.max_color_attachments >= 7 && limits.max_color_attachment_bytes_per_sample >= 112
}
