use std::sync::Arc;
use std::time::Duration;
use tally_event_bus::{EventBus, EventReceiverExt};
use tally_voting::events::{VoteCast, VotingCreated, VotingFinished, VotingStarted};
use tally_voting::*;
use tokio::time::timeout;

fn pid(id: &str) -> ParticipantId {
    ParticipantId::new(id).unwrap()
}

#[tokio::test]
async fn movie_night_emits_every_notification() {
    let clock = Arc::new(ManualClock::new(5_000));
    let registry = VotingRegistry::builder().clock(clock.clone()).build().unwrap();
    let bus = registry.events();
    let mut created = bus.subscribe::<VotingCreated>().unwrap();
    let mut started = bus.subscribe::<VotingStarted>().unwrap();
    let mut cast = bus.subscribe::<VoteCast>().unwrap();
    let mut finished = bus.subscribe::<VotingFinished>().unwrap();

    let creator = pid("creator");
    let id = registry.create_voting(&creator, vec!["Movie1".into(), "Movie2".into()], 3600).unwrap();
    registry.start_voting(&creator, id).unwrap();
    registry.vote(&pid("p1"), id, "Movie1").unwrap();
    registry.vote(&pid("p2"), id, "Movie2").unwrap();
    registry.vote(&pid("p3"), id, "Movie1").unwrap();
    clock.advance(3600);
    registry.finish_voting(&creator, id).unwrap();

    let event = EventReceiverExt::recv(&mut created).await.unwrap();
    assert_eq!(*event, VotingCreated { session_id: 0, creator: creator.clone(), end_time: 8_600 });

    let event = EventReceiverExt::recv(&mut started).await.unwrap();
    assert_eq!(event.session_id, 0);

    let mut votes = Vec::new();
    while let Some(event) = cast.try_next() {
        votes.push((event.voter.to_string(), event.candidate_name.clone()));
    }
    assert_eq!(
        votes,
        [
            ("p1".to_owned(), "Movie1".to_owned()),
            ("p2".to_owned(), "Movie2".to_owned()),
            ("p3".to_owned(), "Movie1".to_owned()),
        ]
    );

    let event = EventReceiverExt::recv(&mut finished).await.unwrap();
    assert_eq!(*event, VotingFinished { session_id: 0, winner_name: "Movie1".into() });
}

#[tokio::test]
async fn rejected_operations_publish_nothing() {
    let clock = Arc::new(ManualClock::new(0));
    let registry = VotingRegistry::builder().clock(clock.clone()).build().unwrap();
    let mut cast = registry.events().subscribe::<VoteCast>().unwrap();
    let mut finished = registry.events().subscribe::<VotingFinished>().unwrap();
    let mut created = registry.events().subscribe::<VotingCreated>().unwrap();

    let creator = pid("c");
    assert!(registry.create_voting(&creator, Vec::new(), 1).is_err());
    let id = registry.create_voting(&creator, vec!["A".into()], 10).unwrap();
    assert_eq!(created.try_next().map(|e| e.session_id), Some(id));
    assert!(created.try_next().is_none());

    assert!(registry.vote(&pid("v"), id, "A").is_err());
    registry.start_voting(&creator, id).unwrap();
    assert!(registry.vote(&pid("v"), id, "B").is_err());
    assert!(registry.finish_voting(&creator, id).is_err());

    assert!(cast.try_next().is_none());
    assert!(finished.try_next().is_none());
}

#[tokio::test]
async fn shared_bus_receives_from_registry() {
    let bus = EventBus::new();
    let mut created = bus.subscribe::<VotingCreated>().unwrap();
    let registry = VotingRegistry::builder()
        .event_bus(bus.clone())
        .clock(Arc::new(ManualClock::new(1)))
        .build()
        .unwrap();

    registry.create_voting(&pid("c"), vec!["A".into()], 1).unwrap();
    let event = timeout(Duration::from_secs(1), EventReceiverExt::recv(&mut created))
        .await
        .expect("notification not delivered")
        .unwrap();
    assert_eq!(event.end_time, 2);
}

#[tokio::test]
async fn subscriber_may_call_back_into_the_registry() {
    let clock = Arc::new(ManualClock::new(0));
    let registry = VotingRegistry::builder().clock(clock.clone()).build().unwrap();
    let mut cast = registry.events().subscribe::<VoteCast>().unwrap();

    let creator = pid("c");
    let id = registry.create_voting(&creator, vec!["A".into(), "B".into()], 10).unwrap();
    registry.start_voting(&creator, id).unwrap();

    let observer = registry.clone();
    let handle = tokio::spawn(async move {
        let event = EventReceiverExt::recv(&mut cast).await.unwrap();
        // Re-entering with the same voter must see the committed vote.
        let again = observer.vote(&event.voter, event.session_id, "B");
        (observer.has_user_voted(event.session_id, &event.voter).unwrap(), again)
    });

    registry.vote(&pid("v"), id, "A").unwrap();
    let (voted, again) = handle.await.unwrap();
    assert!(voted);
    assert!(matches!(again, Err(VotingError::AlreadyVoted { .. })));

    let counts: Vec<u64> = registry.get_voting(id).unwrap().candidates.iter().map(|c| c.vote_count).collect();
    assert_eq!(counts, vec![1, 0]);
}

#[tokio::test]
async fn votes_from_one_thread_are_announced_in_commit_order() {
    let registry = VotingRegistry::builder().clock(Arc::new(ManualClock::new(0))).build().unwrap();
    let mut cast = registry.events().subscribe::<VoteCast>().unwrap();

    let creator = pid("c");
    let id = registry.create_voting(&creator, vec!["A".into(), "B".into()], 10).unwrap();
    registry.start_voting(&creator, id).unwrap();

    let voters: Vec<String> = (0..40).map(|i| format!("voter-{i:02}")).collect();
    for (i, voter) in voters.iter().enumerate() {
        registry.vote(&pid(voter), id, if i % 2 == 0 { "A" } else { "B" }).unwrap();
    }

    let mut announced = Vec::new();
    while let Some(event) = cast.try_next() {
        announced.push(event.voter.to_string());
    }
    assert_eq!(announced, voters);
}
