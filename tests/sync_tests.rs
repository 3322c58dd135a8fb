// Connection list lifecycle: snapshot load, push merging, unmount and refresh

mod common;
use common::{conn, ids, push_payload, setup_logging, FakeApi, Reply};

use std::sync::Arc;
use tokio::time::{sleep, Duration};

use skillmate::push::CONNECTION_UPDATED;
use skillmate::requests::GENERIC_FAILURE;
use skillmate::{store, ConnectionList, LocalPushChannel, PushBridge, PushChannel, SyncError, ToastKind, Toaster};

fn setup() -> (Arc<FakeApi>, Arc<LocalPushChannel>, Toaster, ConnectionList) {
    setup_logging();
    let api = Arc::new(FakeApi::new());
    let channel = Arc::new(LocalPushChannel::new());
    let toaster = Toaster::new();
    let list = ConnectionList::new(api.clone(), channel.clone(), toaster.clone());
    (api, channel, toaster, list)
}

#[tokio::test]
async fn test_mount_loads_sorted_snapshot() {
    let (api, channel, toaster, mut list) = setup();
    api.set_connections(Reply::Ok(vec![
        conn("b", "Bob", Some(5)),
        conn("q", "Quinn", None),
        conn("a", "Ada", Some(10)),
    ]));

    assert!(list.mount(Some("me")).await.unwrap());

    assert_eq!(ids(&list.visible("")), vec!["a", "b", "q"]);
    assert_eq!(api.fetch_calls(), vec![Some("me".to_string())]);
    assert_eq!(channel.handler_count(CONNECTION_UPDATED), 1);
    assert!(list.is_mounted());
    assert!(!list.is_loading());
    assert!(toaster.current().is_none());
}

#[tokio::test]
async fn test_failed_snapshot_degrades_to_empty_list_with_toast() {
    let (api, _channel, toaster, mut list) = setup();
    api.set_connections(Reply::Rejected(Some("Session expired".to_string())));

    assert!(!list.mount(None).await.unwrap());

    assert!(list.visible("").is_empty());
    let toast = toaster.current().unwrap();
    assert_eq!(toast.text, "Session expired");
    assert_eq!(toast.kind, ToastKind::Error);
    // Still subscribed: pushes keep flowing after a failed fetch
    assert!(list.is_mounted());
}

#[tokio::test]
async fn test_network_failure_toast_carries_transport_text() {
    let (api, _channel, toaster, mut list) = setup();
    api.set_connections(Reply::Network("connection refused".to_string()));

    list.mount(None).await.unwrap();

    assert_eq!(toaster.current().unwrap().text, "connection refused");
}

#[tokio::test]
async fn test_rejection_without_message_uses_generic_toast() {
    let (api, _channel, toaster, mut list) = setup();
    api.set_connections(Reply::Rejected(None));

    list.mount(None).await.unwrap();

    assert_eq!(toaster.current().unwrap().text, GENERIC_FAILURE);
}

#[tokio::test]
async fn test_pushes_update_the_mounted_list() {
    let (api, channel, _toaster, mut list) = setup();
    api.set_connections(Reply::Ok(vec![conn("A", "Ada", Some(10)), conn("B", "Bob", Some(5))]));
    list.mount(None).await.unwrap();

    let mut bumped = conn("B", "Bob", Some(20));
    bumped.unread_count = 3;
    channel.emit(CONNECTION_UPDATED, &push_payload(&bumped));

    assert_eq!(ids(&list.visible("")), vec!["B", "A"]);
    assert_eq!(list.total_unread(), 3);

    // New peer shows up through a push alone
    channel.emit(CONNECTION_UPDATED, &push_payload(&conn("C", "Cy", Some(15))));
    assert_eq!(ids(&list.visible("")), vec!["B", "C", "A"]);
}

#[tokio::test]
async fn test_redelivered_push_is_harmless() {
    let (api, channel, _toaster, mut list) = setup();
    api.set_connections(Reply::Ok(vec![conn("A", "Ada", Some(10)), conn("B", "Bob", None)]));
    list.mount(None).await.unwrap();

    let payload = push_payload(&conn("C", "Cy", Some(10)));
    channel.emit(CONNECTION_UPDATED, &payload);
    let after_once = list.visible("");
    channel.emit(CONNECTION_UPDATED, &payload);
    channel.emit(CONNECTION_UPDATED, &payload);

    assert_eq!(list.visible(""), after_once);
}

#[tokio::test]
async fn test_unmounted_list_ignores_pushes() {
    let (api, channel, _toaster, mut list) = setup();
    api.set_connections(Reply::Ok(vec![conn("A", "Ada", Some(10))]));
    list.mount(None).await.unwrap();
    let before = list.visible("");

    list.unmount();
    let delivered = channel.emit(CONNECTION_UPDATED, &push_payload(&conn("Z", "Zed", Some(99))));

    assert_eq!(delivered, 0);
    assert_eq!(list.visible(""), before);
    assert!(!list.is_mounted());
}

#[tokio::test]
async fn test_mount_cycles_never_stack_handlers() {
    let (api, channel, _toaster, mut list) = setup();
    api.set_connections(Reply::Ok(vec![conn("A", "Ada", Some(10))]));

    for _ in 0..5 {
        list.mount(None).await.unwrap();
        assert_eq!(channel.handler_count(CONNECTION_UPDATED), 1);
        list.unmount();
        assert_eq!(channel.handler_count(CONNECTION_UPDATED), 0);
    }
}

#[tokio::test]
async fn test_second_mount_while_active_is_refused() {
    let (_api, channel, _toaster, mut list) = setup();
    list.mount(None).await.unwrap();

    assert!(matches!(list.mount(None).await, Err(SyncError::AlreadySubscribed(_))));
    assert_eq!(channel.handler_count(CONNECTION_UPDATED), 1);
}

#[tokio::test]
async fn test_dropping_the_list_releases_its_handler() {
    let (_api, channel, _toaster, mut list) = setup();
    list.mount(None).await.unwrap();

    drop(list);

    assert_eq!(channel.handler_count(CONNECTION_UPDATED), 0);
}

#[tokio::test(start_paused = true)]
async fn test_push_before_snapshot_is_overwritten_by_snapshot() {
    // Arrival order decides, not timestamps: the snapshot lands last and wins
    // even though the pushed record is newer.
    let (api, channel, _toaster, mut list) = setup();
    api.set_connections(Reply::Ok(vec![conn("A", "Ada", Some(10))]));
    api.set_fetch_delay(Duration::from_millis(200));

    let mut newer = conn("A", "Ada", Some(50));
    newer.unread_count = 7;
    let pusher = channel.clone();
    let (mounted, _) = tokio::join!(list.mount(None), async move {
        sleep(Duration::from_millis(50)).await;
        pusher.emit(CONNECTION_UPDATED, &push_payload(&newer));
    });
    mounted.unwrap();

    let a = store::lock(&list.store()).get("A").cloned().unwrap();
    assert_eq!(a.unread_count, 0);
    assert_eq!(a, conn("A", "Ada", Some(10)));
}

#[tokio::test(start_paused = true)]
async fn test_loading_flag_tracks_fetch() {
    let (api, _channel, _toaster, mut list) = setup();
    api.set_fetch_delay(Duration::from_millis(100));
    let loading = list.subscribe_loading();

    let watcher = async move {
        sleep(Duration::from_millis(50)).await;
        let during = *loading.borrow();
        during
    };
    let (_, during) = tokio::join!(list.mount(None), watcher);

    assert!(during);
    assert!(!list.is_loading());
}

#[tokio::test]
async fn test_refresh_removes_connections_missing_from_server() {
    let (api, channel, _toaster, mut list) = setup();
    api.set_connections(Reply::Ok(vec![conn("A", "Ada", Some(10)), conn("B", "Bob", Some(5))]));
    list.mount(None).await.unwrap();
    channel.emit(CONNECTION_UPDATED, &push_payload(&conn("C", "Cy", Some(1))));
    assert_eq!(list.visible("").len(), 3);

    api.set_connections(Reply::Ok(vec![conn("B", "Bob", Some(6))]));
    assert!(list.refresh().await);

    assert_eq!(ids(&list.visible("")), vec!["B"]);
}

#[tokio::test]
async fn test_visible_applies_name_filter() {
    let (api, _channel, _toaster, mut list) = setup();
    api.set_connections(Reply::Ok(vec![
        conn("1", "Ada Lovelace", Some(3)),
        conn("2", "Grace Hopper", Some(2)),
        conn("3", "Adam", Some(1)),
    ]));
    list.mount(None).await.unwrap();

    assert_eq!(ids(&list.visible("ad")), vec!["1", "3"]);
    assert_eq!(list.visible("a").len(), 3);
    // A trailing space is part of the match, so "Adam" drops out
    assert_eq!(ids(&list.visible("ada ")), vec!["1"]);
}

#[tokio::test]
async fn test_bridge_works_with_any_channel_handle() {
    // The bridge only needs the trait object; no global channel is involved
    setup_logging();
    let channel: Arc<dyn PushChannel> = Arc::new(LocalPushChannel::new());
    let bridge = PushBridge::new(channel.clone());
    let shared = store::shared(skillmate::ConnectionStore::new());

    let subscription = bridge.subscribe(shared.clone()).unwrap();
    assert!(bridge.is_subscribed());
    subscription.unsubscribe();
    assert!(!bridge.is_subscribed());
    assert!(store::lock(&shared).is_empty());
}
