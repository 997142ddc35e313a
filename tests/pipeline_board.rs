use crm_tests::TestContext;
use products_crm::{
    BoardStatus, CrmError, DragState, DropOutcome, KanbanController, NewDeal, RecordStore,
};

#[tokio::test]
async fn drag_and_drop_commits_through_the_database() {
    let ctx = TestContext::sqlite().await;
    let ada = ctx.contact("Ada Lovelace", "ada@acme.test").await;
    let pilot = ctx
        .store
        .create_deal(NewDeal::new("ACME Pilot", ada.id, 100))
        .await
        .unwrap();
    ctx.store
        .create_deal(NewDeal::new("ACME Rollout", ada.id, 50).in_stage("Qualified"))
        .await
        .unwrap();

    let mut board = KanbanController::open(ctx.dyn_store()).await.unwrap();
    assert_eq!(board.status(), &BoardStatus::Ready);
    assert_eq!(board.aggregate("Lead").count, 1);
    assert_eq!(board.aggregate("Lead").total_value, 100);
    assert_eq!(board.contact_name(ada.id), Some("Ada Lovelace"));

    assert!(board.drag_start(pilot.id));
    let outcome = board.drop_on(Some("Qualified")).await.unwrap();
    assert!(matches!(outcome, DropOutcome::Moved(_)));

    assert_eq!(board.aggregate("Lead").count, 0);
    assert_eq!(board.aggregate("Lead").total_value, 0);
    assert_eq!(board.aggregate("Qualified").count, 2);
    assert_eq!(board.aggregate("Qualified").total_value, 150);

    let stored = ctx.store.get_deal(pilot.id).await.unwrap().unwrap();
    assert_eq!(stored.stage, "Qualified");
    assert_eq!(board.drag_state(), &DragState::Idle);
}

#[tokio::test]
async fn terminal_deals_are_kept_off_the_columns() {
    let ctx = TestContext::sqlite().await;
    let ada = ctx.contact("Ada Lovelace", "ada@acme.test").await;
    let won = ctx
        .store
        .create_deal(NewDeal::new("Signed", ada.id, 900).in_stage("Closed Won"))
        .await
        .unwrap();

    let board = KanbanController::open(ctx.dyn_store()).await.unwrap();
    let columns = board.board();
    assert_eq!(columns.len(), 4);
    assert!(columns.iter().all(|column| column.deals.iter().all(|d| d.id != won.id)));
    assert!(board.deal(won.id).is_some());
}

#[tokio::test]
async fn deleting_removes_from_store_and_board() {
    let ctx = TestContext::sqlite().await;
    let ada = ctx.contact("Ada Lovelace", "ada@acme.test").await;
    let deal = ctx
        .store
        .create_deal(NewDeal::new("Short lived", ada.id, 5))
        .await
        .unwrap();

    let mut board = KanbanController::open(ctx.dyn_store()).await.unwrap();
    assert!(board.delete_deal(deal.id).await.unwrap());
    assert!(board.deal(deal.id).is_none());
    assert!(ctx.store.get_deal(deal.id).await.unwrap().is_none());

    let err = board
        .update_deal(deal.id, products_crm::DealPatch::stage("Lead"))
        .await
        .unwrap_err();
    assert!(matches!(err, CrmError::Save(ref e) if e.is_not_found()));
}
