use std::marker::PhantomData;

use wgpu::util::DeviceExt;

/// One `Content` value living in a uniform buffer
///
/// The last uploaded bytes are kept on the CPU side so per-frame updates that
/// repeat the same value do not reach the queue.
pub struct UniformBuffer<Content> {
    buffer: wgpu::Buffer,
    uploaded: Vec<u8>,
    content_type: PhantomData<Content>,
}

impl<Content: bytemuck::Pod> UniformBuffer<Content> {
    /// Creates a buffer labelled `label` holding `initial`
    pub fn new(device: &wgpu::Device, label: &str, initial: Content) -> Self {
        let contents = bytemuck::bytes_of(&initial);
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        UniformBuffer {
            buffer,
            uploaded: contents.to_vec(),
            content_type: PhantomData,
        }
    }

    /// Queues a write of `content` unless it is already in the buffer.
    /// Returns whether a write was queued.
    pub fn update_content(&mut self, queue: &wgpu::Queue, content: Content) -> bool {
        let bytes = bytemuck::bytes_of(&content);
        if !needs_upload(&self.uploaded, bytes) {
            return false;
        }
        queue.write_buffer(&self.buffer, 0, bytes);
        self.uploaded.clear();
        self.uploaded.extend_from_slice(bytes);
        true
    }

    pub fn binding_resource(&self) -> wgpu::BindingResource {
        self.buffer.as_entire_binding()
    }

    /// Bind group entry exposing the whole buffer at `binding`
    pub fn entry(&self, binding: u32) -> wgpu::BindGroupEntry {
        wgpu::BindGroupEntry {
            binding,
            resource: self.binding_resource(),
        }
    }
}

fn needs_upload(uploaded: &[u8], next: &[u8]) -> bool {
    uploaded != next
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_changed_bytes_are_uploaded() {
        let first = [1.0f32, 0.0, 0.0, 1.0];
        let uploaded = bytemuck::bytes_of(&first).to_vec();

        assert!(!needs_upload(&uploaded, bytemuck::bytes_of(&first)));
        assert!(needs_upload(&uploaded, bytemuck::bytes_of(&[1.0f32, 0.5, 0.0, 1.0])));
    }
}
