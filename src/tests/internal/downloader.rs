//! 下载器测试：正常下载、续传、并发上限、多余字节、请求头、钩子、测速、暂停与恢复、周期刷新。
//!
//! 所有用例都连接本地 Range 服务器（见 `tests::lib`），不依赖外网。

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::block_downloader::{
    Block, BlockDownloader, DownloadHook, DownloadProgress, DownloadStatus, DownloaderConfig,
    JobInfo, split_blocks,
};
use crate::tests::{Behavior, TestServer, finish_within, init_tracing, random_bytes};

fn target_in(dir: &tempfile::TempDir) -> std::path::PathBuf {
    dir.path().join("target.bin")
}

#[tokio::test(flavor = "multi_thread")]
async fn two_blocks_happy_path() {
    init_tracing();
    let data = random_bytes(2048);
    let server = TestServer::start(data.clone(), Behavior::Normal).await;
    let dir = tempfile::tempdir().unwrap();
    let target = target_in(&dir);

    let info = JobInfo::new(&target, split_blocks(2048, 1024), vec![server.uri("file")], 2);
    let downloader = BlockDownloader::new(info);
    downloader.begin_download().unwrap();
    assert!(downloader.downloading(), "启动后应立即处于下载中");

    assert_eq!(finish_within(&downloader, 10).await, DownloadStatus::Completed);
    assert_eq!(std::fs::read(&target).unwrap(), data);
    assert_eq!(downloader.downloaded_size(), 2048);
    assert!(downloader.completed());
    assert!(!downloader.downloading());
    assert!(!downloader.failed());
    assert_eq!(downloader.failed_message(), None);

    let mut ranges: Vec<_> = server.requests().into_iter().filter_map(|r| r.range).collect();
    ranges.sort_unstable();
    assert_eq!(ranges, vec![(0, 1023), (1024, 2047)]);

    let blocks = downloader.job_info().block_list;
    assert!(blocks.iter().all(|b| b.completed && b.remaining() == 0));
}

#[tokio::test(flavor = "multi_thread")]
async fn resume_fetches_only_missing_bytes() {
    init_tracing();
    let data = random_bytes(2048);
    let server = TestServer::start(data.clone(), Behavior::Normal).await;
    let dir = tempfile::tempdir().unwrap();
    let target = target_in(&dir);
    // 上次运行已经写好的前 512 字节
    std::fs::write(&target, &data[..512]).unwrap();

    let mut partial = Block::new(0, 1023);
    partial.begin_offset = 512;
    partial.downloaded_size = 512;
    let info = JobInfo::new(
        &target,
        vec![partial, Block::new(1024, 2047)],
        vec![server.uri("file")],
        2,
    );

    let downloader = BlockDownloader::new(info);
    assert_eq!(downloader.downloaded_size(), 512, "初始进度来自块记录");
    downloader.begin_download().unwrap();

    assert_eq!(finish_within(&downloader, 10).await, DownloadStatus::Completed);
    assert_eq!(downloader.downloaded_size(), 2048);
    assert_eq!(std::fs::read(&target).unwrap(), data);

    let mut ranges: Vec<_> = server.requests().into_iter().filter_map(|r| r.range).collect();
    ranges.sort_unstable();
    assert_eq!(ranges, vec![(512, 1023), (1024, 2047)]);
}

#[tokio::test(flavor = "multi_thread")]
async fn all_blocks_completed_means_no_request() {
    init_tracing();
    let server = TestServer::start(random_bytes(1024), Behavior::Normal).await;
    let dir = tempfile::tempdir().unwrap();

    let mut done = Block::new(0, 1023);
    done.begin_offset = 1024;
    done.downloaded_size = 1024;
    done.completed = true;

    let fired = Arc::new(AtomicUsize::new(0));
    let fired_hook = Arc::clone(&fired);
    let downloader = BlockDownloader::new(JobInfo::new(
        target_in(&dir),
        vec![done],
        vec![server.uri("file")],
        4,
    ))
    .on_completed(move || {
        let fired = Arc::clone(&fired_hook);
        async move {
            fired.fetch_add(1, Ordering::SeqCst);
        }
    });
    downloader.begin_download().unwrap();

    assert_eq!(finish_within(&downloader, 5).await, DownloadStatus::Completed);
    assert!(downloader.completed());
    assert_eq!(server.request_count(), 0);
    assert_eq!(fired.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn empty_block_list_completes() {
    let dir = tempfile::tempdir().unwrap();
    let downloader = BlockDownloader::new(JobInfo::new(
        target_in(&dir),
        Vec::new(),
        vec!["http://127.0.0.1:1/unused".to_string()],
        2,
    ));
    downloader.begin_download().unwrap();
    assert_eq!(finish_within(&downloader, 5).await, DownloadStatus::Completed);
    assert_eq!(downloader.downloaded_size(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrency_never_exceeds_thread_count() {
    init_tracing();
    let data = random_bytes(8 * 1024);
    let server = TestServer::start(
        data.clone(),
        Behavior::Slow {
            piece: 256,
            delay_ms: 5,
        },
    )
    .await;
    let dir = tempfile::tempdir().unwrap();
    let target = target_in(&dir);

    let downloader = BlockDownloader::new(JobInfo::new(
        &target,
        split_blocks(8 * 1024, 1024),
        vec![server.uri("file")],
        3,
    ));
    downloader.begin_download().unwrap();

    assert_eq!(finish_within(&downloader, 20).await, DownloadStatus::Completed);
    assert_eq!(std::fs::read(&target).unwrap(), data);
    assert_eq!(server.request_count(), 8, "每块恰好一次请求");
    assert!(
        server.peak_in_flight() <= 3,
        "同时在途请求数 {} 超过 thread_count",
        server.peak_in_flight()
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn thread_count_is_clamped_to_block_count() {
    let data = random_bytes(2048);
    let server = TestServer::start(data.clone(), Behavior::Normal).await;
    let dir = tempfile::tempdir().unwrap();
    let target = target_in(&dir);

    let downloader = BlockDownloader::new(JobInfo::new(
        &target,
        split_blocks(2048, 1024),
        vec![server.uri("file")],
        16,
    ));
    downloader.begin_download().unwrap();

    assert_eq!(finish_within(&downloader, 10).await, DownloadStatus::Completed);
    assert_eq!(server.request_count(), 2);
    assert_eq!(std::fs::read(&target).unwrap(), data);
}

#[tokio::test(flavor = "multi_thread")]
async fn extra_bytes_past_block_end_are_discarded() {
    init_tracing();
    let data = random_bytes(2048);
    let server = TestServer::start(data.clone(), Behavior::Overflow { extra: 300 }).await;
    let dir = tempfile::tempdir().unwrap();
    let target = target_in(&dir);

    let downloader = BlockDownloader::new(JobInfo::new(
        &target,
        split_blocks(2048, 1024),
        vec![server.uri("file")],
        2,
    ));
    downloader.begin_download().unwrap();

    assert_eq!(finish_within(&downloader, 10).await, DownloadStatus::Completed);
    let written = std::fs::read(&target).unwrap();
    assert_eq!(written.len(), 2048, "多余字节不能写出块边界");
    assert_eq!(written, data);
    assert_eq!(downloader.downloaded_size(), 2048);
}

#[tokio::test(flavor = "multi_thread")]
async fn job_headers_are_sent_with_every_request() {
    let server = TestServer::start(random_bytes(2048), Behavior::Normal).await;
    let dir = tempfile::tempdir().unwrap();

    let info = JobInfo::new(
        target_in(&dir),
        split_blocks(2048, 512),
        vec![server.uri("file")],
        2,
    )
    .with_header("User-Agent", "pd-test/1.0");
    let downloader = BlockDownloader::new(info);
    downloader.begin_download().unwrap();

    assert_eq!(finish_within(&downloader, 10).await, DownloadStatus::Completed);
    let requests = server.requests();
    assert_eq!(requests.len(), 4);
    assert!(
        requests
            .iter()
            .all(|r| r.user_agent.as_deref() == Some("pd-test/1.0"))
    );
}

/// 记录钩子调用顺序的完整钩子
struct RecordingHook {
    events: Arc<Mutex<Vec<&'static str>>>,
}

#[async_trait]
impl DownloadHook for RecordingHook {
    fn on_progress(&mut self, _progress: &DownloadProgress) {
        let mut events = self.events.lock().unwrap();
        if events.last() != Some(&"progress") {
            events.push("progress");
        }
    }

    async fn on_completed(&mut self) {
        self.events.lock().unwrap().push("completed");
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn hooks_report_progress_then_completion() {
    let data = random_bytes(4096);
    let server = TestServer::start(data, Behavior::Normal).await;
    let dir = tempfile::tempdir().unwrap();

    let last_seen = Arc::new(AtomicU64::new(0));
    let last_seen_hook = Arc::clone(&last_seen);
    let failed_calls = Arc::new(AtomicUsize::new(0));
    let failed_hook = Arc::clone(&failed_calls);
    let events = Arc::new(Mutex::new(Vec::new()));

    let downloader = BlockDownloader::new(JobInfo::new(
        target_in(&dir),
        split_blocks(4096, 1024),
        vec![server.uri("file")],
        2,
    ))
    .on_progress(move |p| {
        last_seen_hook.fetch_max(p.downloaded_size, Ordering::SeqCst);
    })
    .on_failed(move |_| {
        let failed = Arc::clone(&failed_hook);
        async move {
            failed.fetch_add(1, Ordering::SeqCst);
        }
    })
    .with_hook(RecordingHook {
        events: Arc::clone(&events),
    });
    downloader.begin_download().unwrap();

    assert_eq!(finish_within(&downloader, 10).await, DownloadStatus::Completed);
    assert_eq!(last_seen.load(Ordering::SeqCst), 4096);
    assert_eq!(failed_calls.load(Ordering::SeqCst), 0);
    assert_eq!(*events.lock().unwrap(), vec!["progress", "completed"]);

    let progress = downloader.progress().get_current().unwrap();
    assert_eq!(progress.downloaded_size, 4096);
    assert_eq!(progress.total_size, 4096);
    assert!((progress.pct() - 100.0).abs() < f64::EPSILON);
}

#[tokio::test(flavor = "multi_thread")]
async fn speed_is_sampled_and_reset_when_finished() {
    init_tracing();
    let data = random_bytes(64 * 1024);
    let server = TestServer::start(
        data,
        Behavior::Slow {
            piece: 1024,
            delay_ms: 5,
        },
    )
    .await;
    let dir = tempfile::tempdir().unwrap();

    let downloader = BlockDownloader::new(JobInfo::new(
        target_in(&dir),
        split_blocks(64 * 1024, 64 * 1024),
        vec![server.uri("file")],
        1,
    ))
    .with_config(DownloaderConfig {
        speed_sample_interval: Duration::from_millis(50),
        ..DownloaderConfig::default()
    });
    downloader.begin_download().unwrap();

    let mut watcher = downloader.progress().watch();
    let sampled = tokio::time::timeout(Duration::from_secs(10), watcher.wait_for(|p| p.speed > 0))
        .await
        .expect("下载过程中应采样到非零速度")
        .unwrap();
    assert!(sampled.speed <= 64 * 1024);

    assert_eq!(finish_within(&downloader, 20).await, DownloadStatus::Completed);
    assert_eq!(downloader.speed(), 0, "结束后速度归零");
    assert_eq!(downloader.progress().get_current().unwrap().speed, 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn pause_mid_stream_then_resume() {
    init_tracing();
    let total = 256 * 1024;
    let data = random_bytes(total);
    let server = TestServer::start(
        data.clone(),
        Behavior::Slow {
            piece: 4096,
            delay_ms: 10,
        },
    )
    .await;
    let dir = tempfile::tempdir().unwrap();
    let target = target_in(&dir);

    let downloader = BlockDownloader::new(JobInfo::new(
        &target,
        split_blocks(total as u64, total as u64),
        vec![server.uri("file")],
        1,
    ));
    downloader.begin_download().unwrap();

    let mut watcher = downloader.progress().watch();
    tokio::time::timeout(
        Duration::from_secs(10),
        watcher.wait_for(|p| p.downloaded_size >= (total / 2) as u64),
    )
    .await
    .expect("未能下载到一半")
    .unwrap();
    downloader.pause();
    downloader.pause();

    assert_eq!(finish_within(&downloader, 5).await, DownloadStatus::Paused);
    assert!(!downloader.downloading());
    assert!(!downloader.completed());
    assert!(!downloader.failed());

    let done = downloader.downloaded_size();
    assert!(done >= (total / 2) as u64 && done < total as u64, "已下载 {done}");
    let on_disk = std::fs::read(&target).unwrap();
    assert_eq!(on_disk.len() as u64, done, "downloaded_size 应等于实际落盘字节数");
    assert_eq!(on_disk[..], data[..done as usize]);

    // 用快照构造新的下载器继续
    let info = downloader.job_info();
    assert_eq!(info.block_list[0].begin_offset, done);
    assert!(!info.block_list[0].downloading);

    let resumed = BlockDownloader::new(info);
    resumed.begin_download().unwrap();
    assert_eq!(finish_within(&resumed, 20).await, DownloadStatus::Completed);
    assert_eq!(std::fs::read(&target).unwrap(), data);
    assert_eq!(resumed.downloaded_size(), total as u64);

    let last_range = server.requests().last().and_then(|r| r.range);
    assert_eq!(last_range, Some((done, total as u64 - 1)));
}

#[tokio::test(flavor = "multi_thread")]
async fn periodic_refresher_replaces_uris_before_dispatch() {
    init_tracing();
    let data = random_bytes(16 * 1024);
    let server = TestServer::start(
        data.clone(),
        Behavior::Slow {
            piece: 512,
            delay_ms: 5,
        },
    )
    .await;
    let dir = tempfile::tempdir().unwrap();
    let target = target_in(&dir);

    let calls = Arc::new(AtomicUsize::new(0));
    let calls_in_func = Arc::clone(&calls);
    let fresh = server.uri("fresh");
    let downloader = BlockDownloader::new(JobInfo::new(
        &target,
        split_blocks(16 * 1024, 4096),
        vec!["http://127.0.0.1:1/stale".to_string()],
        2,
    ))
    .with_refresh(
        move || {
            calls_in_func.fetch_add(1, Ordering::SeqCst);
            vec![fresh.clone()]
        },
        20,
    );
    downloader.begin_download().unwrap();
    assert_eq!(
        downloader.uris().get_current().unwrap(),
        vec![server.uri("fresh")],
        "首次刷新在派发前同步完成"
    );

    assert_eq!(finish_within(&downloader, 20).await, DownloadStatus::Completed);
    assert_eq!(std::fs::read(&target).unwrap(), data);
    assert!(server.requests().iter().all(|r| r.path == "fresh"));
    assert!(calls.load(Ordering::SeqCst) >= 2, "下载期间应周期刷新");
}
