//! Reference map repository

use super::Catalog;
use crate::domain::reference_map::{MapFormat, ReferenceMap, ReferenceMapPoint};
use crate::shared::error::{CoreError, CoreResult};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter, QueryOrder,
    TransactionTrait,
};
use std::str::FromStr;
use uuid::Uuid;

use crate::infrastructure::database::entities::{ref_map_point, reference_map};

impl Catalog {
    /// Persist a parsed map and all of its points in one transaction.
    pub async fn insert_reference_map(
        &self,
        map: &ReferenceMap,
        points: &[ReferenceMapPoint],
    ) -> CoreResult<()> {
        let txn = self.conn().begin().await?;
        reference_map::ActiveModel {
            map_id: Set(map.map_id),
            name: Set(map.name.clone()),
            source_file: Set(map.source_file.clone()),
            format: Set(map.format.to_string()),
            point_count: Set(points.len() as i32),
            imported_by: Set(map.imported_by.clone()),
            imported_at: Set(map.imported_at),
        }
        .insert(&txn)
        .await?;

        for point in points {
            ref_map_point::ActiveModel {
                point_id: Set(point.point_id),
                map_id: Set(point.map_id),
                name: Set(point.name.clone()),
                description: Set(point.description.clone()),
                lat: Set(point.lat),
                lng: Set(point.lng),
                state: Set(point.state.clone()),
                category: Set(point.category.clone()),
                raw_metadata: Set(point.raw_metadata.clone()),
                aka_names: Set(point.aka_names.clone()),
            }
            .insert(&txn)
            .await?;
        }
        txn.commit().await?;
        Ok(())
    }

    pub async fn list_reference_maps(&self) -> CoreResult<Vec<ReferenceMap>> {
        let rows = reference_map::Entity::find()
            .order_by_desc(reference_map::Column::ImportedAt)
            .all(self.conn())
            .await?;
        Ok(rows.into_iter().map(map_from_model).collect())
    }

    pub async fn get_reference_map(&self, map_id: Uuid) -> CoreResult<ReferenceMap> {
        let row = reference_map::Entity::find_by_id(map_id)
            .one(self.conn())
            .await?
            .ok_or_else(|| CoreError::not_found("reference map", map_id))?;
        Ok(map_from_model(row))
    }

    pub async fn all_ref_points(&self) -> CoreResult<Vec<ReferenceMapPoint>> {
        let rows = ref_map_point::Entity::find()
            .order_by_asc(ref_map_point::Column::Name)
            .all(self.conn())
            .await?;
        Ok(rows.into_iter().map(point_from_model).collect())
    }

    pub async fn get_ref_point(&self, point_id: Uuid) -> CoreResult<ReferenceMapPoint> {
        let row = ref_map_point::Entity::find_by_id(point_id)
            .one(self.conn())
            .await?
            .ok_or_else(|| CoreError::not_found("reference point", point_id))?;
        Ok(point_from_model(row))
    }

    pub async fn delete_reference_map(&self, map_id: Uuid) -> CoreResult<()> {
        let result = reference_map::Entity::delete_by_id(map_id)
            .exec(self.conn())
            .await?;
        if result.rows_affected == 0 {
            return Err(CoreError::not_found("reference map", map_id));
        }
        Ok(())
    }

    pub async fn delete_ref_point(&self, point_id: Uuid) -> CoreResult<()> {
        let point = self.get_ref_point(point_id).await?;
        let result = ref_map_point::Entity::delete_by_id(point_id)
            .exec(self.conn())
            .await?;
        if result.rows_affected == 0 {
            return Err(CoreError::not_found("reference point", point_id));
        }
        self.refresh_map_point_count(point.map_id).await
    }

    pub async fn delete_ref_points(&self, ids: &[Uuid]) -> CoreResult<u64> {
        let result = ref_map_point::Entity::delete_many()
            .filter(ref_map_point::Column::PointId.is_in(ids.iter().copied()))
            .exec(self.conn())
            .await?;
        // Counts drift after bulk deletes; refresh every map.
        let maps = reference_map::Entity::find().all(self.conn()).await?;
        for map in maps {
            self.refresh_map_point_count(map.map_id).await?;
        }
        Ok(result.rows_affected)
    }

    pub async fn set_ref_point_aka(&self, point_id: Uuid, aka: Option<&str>) -> CoreResult<()> {
        ref_map_point::Entity::update_many()
            .col_expr(
                ref_map_point::Column::AkaNames,
                Expr::value(aka.map(str::to_string)),
            )
            .filter(ref_map_point::Column::PointId.eq(point_id))
            .exec(self.conn())
            .await?;
        Ok(())
    }

    async fn refresh_map_point_count(&self, map_id: Uuid) -> CoreResult<()> {
        use sea_orm::PaginatorTrait;
        let count = ref_map_point::Entity::find()
            .filter(ref_map_point::Column::MapId.eq(map_id))
            .count(self.conn())
            .await?;
        reference_map::Entity::update_many()
            .col_expr(reference_map::Column::PointCount, Expr::value(count as i32))
            .filter(reference_map::Column::MapId.eq(map_id))
            .exec(self.conn())
            .await?;
        Ok(())
    }
}

fn map_from_model(m: reference_map::Model) -> ReferenceMap {
    ReferenceMap {
        map_id: m.map_id,
        name: m.name,
        source_file: m.source_file,
        format: MapFormat::from_str(&m.format).unwrap_or(MapFormat::Kml),
        point_count: m.point_count.max(0) as usize,
        imported_by: m.imported_by,
        imported_at: m.imported_at,
    }
}

fn point_from_model(m: ref_map_point::Model) -> ReferenceMapPoint {
    ReferenceMapPoint {
        point_id: m.point_id,
        map_id: m.map_id,
        name: m.name,
        description: m.description,
        lat: m.lat,
        lng: m.lng,
        state: m.state,
        category: m.category,
        raw_metadata: m.raw_metadata,
        aka_names: m.aka_names,
    }
}
