// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

mod common;

use anyhow::{Context, Result};
use common::{depth_only_shader, headless, headless_with};
use kiln_core::graphics::{
    CommandListFlags, CommandQueueType, DeviceError, GraphicsBindResult, GraphicsSettings,
    QueueError,
};
use kiln_core::telemetry::VramProvider;
use kiln_infra::graphics::headless::NativeCall;

#[test]
fn test_deferred_queue_ids_are_recycled() -> Result<()> {
    let (device, _headless) = headless()?;

    let mut first = device.get_deferred_queue()?;
    let second = device.get_deferred_queue()?;
    assert_eq!(first.deferred_id(), Some(0));
    assert_eq!(second.deferred_id(), Some(1));
    assert_eq!(first.queue_type(), CommandQueueType::Deferred);
    assert_eq!(device.deferred_queue_count(), 2);

    device.remove_deferred_queue(&mut first)?;
    assert!(first.is_disposed());
    assert_eq!(device.deferred_queue_count(), 1);
    assert_eq!(
        device.remove_deferred_queue(&mut first),
        Err(QueueError::QueueAlreadyDisposed)
    );

    let third = device.get_deferred_queue()?;
    assert_eq!(third.deferred_id(), Some(0), "The released id is handed out first");

    drop(second);
    assert_eq!(device.deferred_queue_count(), 1);
    Ok(())
}

#[test]
fn test_immediate_queue_misuse() -> Result<()> {
    let (device, _headless) = headless()?;

    assert_eq!(
        device.remove_deferred_queue(&mut device.queue()),
        Err(QueueError::RemoveImmediateQueue)
    );
    assert_eq!(
        device.submit(&mut device.queue()),
        Err(QueueError::SubmitImmediateQueue)
    );

    let mut queue = device.queue();
    assert!(queue.is_immediate());
    assert_eq!(
        queue.begin(CommandListFlags::DEFERRED),
        Err(QueueError::DeferredFlagOnImmediate)
    );
    assert_eq!(queue.end().map(|l| l.is_some()), Err(QueueError::NotRecording));
    queue.begin(CommandListFlags::EMPTY)?;
    assert_eq!(
        queue.begin(CommandListFlags::EMPTY),
        Err(QueueError::AlreadyRecording)
    );
    assert!(queue.end()?.is_none(), "The immediate queue records no list");
    Ok(())
}

#[test]
fn test_submit_executes_on_the_immediate_context() -> Result<()> {
    let (device, headless) = headless()?;
    let shader = depth_only_shader(&device)?;

    let mut deferred = device.get_deferred_queue()?;
    deferred.begin(CommandListFlags::DEFERRED)?;
    assert_eq!(deferred.draw(&shader, 3, 0)?, GraphicsBindResult::Successful);
    device.submit(&mut deferred)?;
    assert!(!deferred.is_recording());

    let entries = headless.call_log().entries();
    let finished = entries
        .iter()
        .find_map(|e| match e.call {
            NativeCall::FinishCommandList(id) => Some((e.context, id)),
            _ => None,
        })
        .context("the deferred queue finished a command list")?;
    let executed = entries
        .iter()
        .find_map(|e| match e.call {
            NativeCall::ExecuteCommandList(id) => Some((e.context, id)),
            _ => None,
        })
        .context("the immediate queue executed the list")?;
    assert_eq!(finished.1, executed.1);
    assert_ne!(finished.0, executed.0, "Recording and replay use different contexts");
    assert_eq!(headless.live_command_lists(), 1);
    Ok(())
}

#[test]
fn test_executed_lists_live_for_the_frame_buffer() -> Result<()> {
    let (device, headless) = headless()?;
    let frames = device.settings().frame_buffer_size;

    let mut deferred = device.get_deferred_queue()?;
    deferred.begin(CommandListFlags::DEFERRED)?;
    let list = deferred.end()?.context("deferred queues return a list")?;
    assert!(list.is_deferred());
    assert_eq!(list.queue_id(), Some(0));
    device.queue().execute(list)?;

    for _ in 1..frames {
        device.begin_frame();
        device.present();
        assert_eq!(headless.live_command_lists(), 1);
    }
    device.begin_frame();
    device.present();
    assert_eq!(headless.live_command_lists(), 0);
    Ok(())
}

#[test]
fn test_only_deferred_lists_run_on_the_immediate_queue() -> Result<()> {
    let (device, _headless) = headless()?;
    let mut deferred = device.get_deferred_queue()?;

    deferred.begin(CommandListFlags::EMPTY)?;
    let plain = deferred.end()?.context("deferred queues return a list")?;
    assert_eq!(
        device.queue().execute(plain),
        Err(QueueError::ExecuteNonDeferredList)
    );

    deferred.begin(CommandListFlags::DEFERRED)?;
    let list = deferred.end()?.context("deferred queues return a list")?;
    let mut other = device.get_deferred_queue()?;
    assert_eq!(other.execute(list), Err(QueueError::ExecuteOnDeferredQueue));
    Ok(())
}

#[test]
fn test_queues_and_lists_belong_to_their_device() -> Result<()> {
    let (device, _headless) = headless()?;
    let (other, _other_headless) = headless()?;
    assert_ne!(device.id(), other.id());

    let mut deferred = device.get_deferred_queue()?;
    assert_eq!(
        other.remove_deferred_queue(&mut deferred),
        Err(QueueError::ForeignQueue)
    );
    assert_eq!(other.submit(&mut deferred), Err(QueueError::ForeignQueue));

    deferred.begin(CommandListFlags::DEFERRED)?;
    let list = deferred.end()?.context("deferred queues return a list")?;
    assert_eq!(
        other.queue().execute(list),
        Err(QueueError::ForeignCommandList)
    );
    Ok(())
}

#[test]
fn test_deferred_queue_limit() -> Result<()> {
    let (device, _headless) = headless_with(GraphicsSettings {
        max_deferred_queues: Some(1),
        ..GraphicsSettings::default()
    })?;

    let queue = device.get_deferred_queue()?;
    assert_eq!(
        device.get_deferred_queue().map(|q| q.deferred_id()),
        Err(DeviceError::Queue(QueueError::DeferredQueueLimit { limit: 1 }))
    );
    drop(queue);
    assert!(device.get_deferred_queue().is_ok());
    Ok(())
}

#[test]
fn test_failed_context_creation_releases_the_id() -> Result<()> {
    let (device, headless) = headless()?;

    headless.fail_contexts(true);
    assert!(matches!(
        device.get_deferred_queue(),
        Err(DeviceError::InitializationFailed(_))
    ));
    assert_eq!(device.deferred_queue_count(), 0);

    headless.fail_contexts(false);
    assert_eq!(device.get_deferred_queue()?.deferred_id(), Some(0));
    Ok(())
}

#[test]
fn test_removed_queue_releases_its_context() -> Result<()> {
    let (device, headless) = headless()?;
    let mut deferred = device.get_deferred_queue()?;

    device.remove_deferred_queue(&mut deferred)?;

    assert_eq!(headless.call_log().calls(), vec![NativeCall::Release]);
    assert_eq!(
        deferred.begin(CommandListFlags::DEFERRED),
        Err(QueueError::QueueAlreadyDisposed)
    );
    Ok(())
}

#[test]
fn test_vram_accounting_from_many_threads() -> Result<()> {
    let (device, _headless) = headless()?;
    let baseline = device.allocated_vram();

    let device = &device;
    std::thread::scope(|scope| {
        for t in 0..32u64 {
            scope.spawn(move || {
                for _ in 0..100 {
                    device.allocate_vram(1024 + t);
                }
                for _ in 0..(t % 4) * 25 {
                    device.deallocate_vram(1024 + t);
                }
            });
        }
    });

    // Each thread keeps (100 - (t % 4) * 25) allocations of 1024 + t bytes.
    let delta: i64 = (0..32i64)
        .map(|t| (100 - (t % 4) * 25) * (1024 + t))
        .sum();
    assert!(delta > 0);
    assert_eq!(device.allocated_vram(), baseline + delta);
    assert!(device.vram_report().peak_usage_bytes >= (baseline + delta) as u64);
    Ok(())
}

#[test]
fn test_deferred_queues_record_on_worker_threads() -> Result<()> {
    let (device, headless) = headless()?;
    let device = &device;

    std::thread::scope(|scope| -> Result<()> {
        let workers: Vec<_> = (0..8)
            .map(|_| {
                scope.spawn(move || -> Result<()> {
                    let mut queue = device.get_deferred_queue()?;
                    queue.begin(CommandListFlags::DEFERRED)?;
                    queue.set_marker("worker");
                    device.submit(&mut queue)?;
                    Ok(())
                })
            })
            .collect();
        for worker in workers {
            worker
                .join()
                .map_err(|_| anyhow::anyhow!("worker thread panicked"))??;
        }
        Ok(())
    })?;

    assert_eq!(
        headless
            .call_log()
            .count(|c| matches!(c, NativeCall::ExecuteCommandList(_))),
        8
    );
    assert_eq!(device.deferred_queue_count(), 0);
    Ok(())
}
